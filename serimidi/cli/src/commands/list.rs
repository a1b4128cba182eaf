use serimidi::{
    midi::{HostMidiDevices, MidiDeviceProvider, VIRTUAL_INPUT, VIRTUAL_OUTPUT},
    serial::{HostSerialPorts, SerialPortProvider, STANDARD_BAUD_RATES},
};

/// Print the serial ports found on this machine and the usual baud rates.
pub fn ports() -> anyhow::Result<()> {
    let ports = HostSerialPorts.list_serial_ports()?;

    if ports.is_empty() {
        println!("no serial ports found");
    }

    for port in ports {
        if port.display_name == port.id {
            println!("{}", port.id);
        } else {
            println!("{:<24} {}", port.id, port.display_name);
        }
    }

    let rates: Vec<_> = STANDARD_BAUD_RATES.iter().map(u32::to_string).collect();
    println!("\nbaud rates : {} (MIDI DIN : 31250)", rates.join(" "));

    Ok(())
}

/// Print the MIDI inputs and outputs the bridge can open.
pub fn devices() -> anyhow::Result<()> {
    let midi = HostMidiDevices;

    println!("outputs :");
    for device in midi.list_midi_outputs()? {
        println!("  {}", describe(&device));
    }

    println!("inputs :");
    for device in midi.list_midi_inputs()? {
        println!("  {}", describe(&device));
    }

    Ok(())
}

fn describe(device: &str) -> String {
    match device {
        VIRTUAL_OUTPUT | VIRTUAL_INPUT => format!("{device} (virtual port)"),
        _ => device.to_owned(),
    }
}
