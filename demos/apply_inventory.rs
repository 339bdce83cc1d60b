//! Applies a segmented-network configuration (VLANs, trunk, NAT, DHCP) to a
//! small lab inventory: two Cisco switches, then two MikroTik routers.
//!
//! The command text is plain caller-supplied data; the engine never
//! generates it. Run with `cargo run --example apply_inventory`.

use anyhow::Result;
use netapply::device::{
    CommandBatch, DeviceDescriptor, DeviceFamily, DevicePlan, DeviceRole, Inventory,
};
use netapply::journal::EventLog;
use netapply::orchestrator::run_all;
use netapply::report::ExitPolicy;
use netapply::runner::RunnerOptions;
use netapply::session::{SshFactory, TransportPolicy};

const LOG_FILE: &str = "netapply_log.txt";

struct Vlan {
    id: u16,
    name: &'static str,
    port: &'static str,
}

const VLANS: &[Vlan] = &[
    Vlan {
        id: 290,
        name: "Ventas",
        port: "e0/1",
    },
    Vlan {
        id: 291,
        name: "Tecnica",
        port: "e0/2",
    },
    Vlan {
        id: 292,
        name: "Visitantes",
        port: "e0/3",
    },
];

const TRUNK_IF: &str = "e0/0";

/// VLAN creation, access port assignment and trunk setup for one switch.
fn switch_batch() -> CommandBatch {
    let mut commands = Vec::new();

    for vlan in VLANS {
        commands.push(format!("vlan {}", vlan.id));
        commands.push(format!("name {}", vlan.name));
    }

    for vlan in VLANS {
        commands.push(format!("interface {}", vlan.port));
        commands.push("switchport mode access".to_string());
        commands.push(format!("switchport access vlan {}", vlan.id));
        commands.push("no shutdown".to_string());
    }

    let allowed: Vec<String> = VLANS
        .iter()
        .map(|vlan| vlan.id.to_string())
        .chain(std::iter::once("1899".to_string()))
        .collect();
    commands.push(format!("interface {TRUNK_IF}"));
    commands.push("switchport trunk encapsulation dot1q".to_string());
    commands.push("switchport mode trunk".to_string());
    commands.push(format!(
        "switchport trunk allowed vlan {}",
        allowed.join(",")
    ));
    commands.push("no shutdown".to_string());

    CommandBatch::new(commands)
}

/// VLAN interfaces, addressing, NAT and DHCP for one router.
fn router_batch() -> CommandBatch {
    CommandBatch::new(
        [
            "/interface vlan add name=Ventas vlan-id=290 interface=ether2",
            "/ip address add address=10.10.18.65/27 interface=Ventas",
            "/interface vlan add name=Tecnica vlan-id=291 interface=ether2",
            "/ip address add address=10.10.18.97/28 interface=Tecnica",
            "/interface vlan add name=Visitantes vlan-id=292 interface=ether2",
            "/ip address add address=10.10.18.113/29 interface=Visitantes",
            "/ip firewall nat add chain=srcnat src-address=10.10.18.64/27 action=masquerade comment=\"NAT Ventas\"",
            "/ip firewall nat add chain=srcnat src-address=10.10.18.96/28 action=masquerade comment=\"NAT Tecnica\"",
            "/ip pool add name=pool_ventas ranges=10.10.18.66-10.10.18.94",
            "/ip dhcp-server add name=dhcp_ventas interface=Ventas address-pool=pool_ventas lease-time=1h disabled=no",
            "/ip dhcp-server network add address=10.10.18.64/27 gateway=10.10.18.65 dns-server=8.8.8.8",
        ]
        .iter()
        .map(|cmd| (*cmd).to_string())
        .collect(),
    )
}

fn switch(addr: &str) -> DeviceDescriptor {
    DeviceDescriptor {
        family: DeviceFamily::CiscoIos,
        addr: addr.to_string(),
        port: 22,
        username: "netadmin".to_string(),
        password: "P4ssw0rdNet".to_string(),
        enable_secret: Some("P4ssw0rdNet".to_string()),
        role: DeviceRole::Secondary,
        // Old switch images only offer diffie-hellman-group14-sha1 / ssh-rsa.
        transport: TransportPolicy::legacy_compatible(),
    }
}

fn router(addr: &str, role: DeviceRole) -> DeviceDescriptor {
    DeviceDescriptor {
        family: DeviceFamily::MikrotikRouterOs,
        addr: addr.to_string(),
        port: 22,
        username: "admin".to_string(),
        password: "admin".to_string(),
        enable_secret: None,
        role,
        transport: TransportPolicy::default(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let inventory = Inventory {
        switches: vec![
            DevicePlan {
                descriptor: switch("10.10.18.57"),
                batch: switch_batch(),
            },
            DevicePlan {
                descriptor: switch("10.10.18.58"),
                batch: switch_batch(),
            },
        ],
        routers: vec![
            DevicePlan {
                descriptor: router("10.10.18.59", DeviceRole::Primary),
                batch: router_batch(),
            },
            DevicePlan {
                descriptor: router("10.10.18.60", DeviceRole::Secondary),
                batch: router_batch(),
            },
        ],
    };

    println!("=== Network configuration run ===");
    let journal = EventLog::to_file(LOG_FILE)?;
    let summary = run_all(&SshFactory, &inventory, &journal, &RunnerOptions::default()).await;

    for report in &summary.reports {
        print!("{}", report.render());
    }

    if !summary.succeeded(ExitPolicy::ConnectivityOnly) {
        std::process::exit(1);
    }
    Ok(())
}
