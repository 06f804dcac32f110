//! Serial port listing

use macropad::Config;
use macropad_transport::list_ports;

pub fn ports(config: &Config) -> anyhow::Result<()> {
    let ports = list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }

    println!("Serial ports (device id prefix {}):", config.device_id);
    for port in ports {
        let marker = if port.matches(&config.device_id) { "*" } else { " " };
        println!(" {marker} {:<16} {}", port.port_name, port.device_id);
    }
    Ok(())
}
