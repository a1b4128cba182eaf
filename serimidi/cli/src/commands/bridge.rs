use serimidi::{
    controllers::{BridgeController, BridgeEvent, ConfigChange},
    midi::{FramingConfig, HostMidiDevices, SysexFraming, DEFAULT_MAX_SYSEX_LEN},
    serial::{is_standard_baud_rate, HostSerialPorts},
};
use std::time::Duration;

const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, clap::Parser)]
pub struct Options {
    /// Serial port to read MIDI bytes from, see `serimidi ports`
    #[arg(long)]
    port: String,

    /// Serial baud rate
    #[arg(long, default_value_t = 31_250)]
    baud: u32,

    /// MIDI output to forward commands to, see `serimidi devices`.
    /// Use `__virtualOutput` to create a virtual port
    #[arg(long)]
    output: Option<String>,

    /// MIDI input to hold open while bridging
    #[arg(long)]
    input: Option<String>,

    /// Frame sysex messages by this many bytes instead of waiting for `F7`
    #[arg(long)]
    sysex_length: Option<usize>,

    /// Longest sysex message accepted
    #[arg(long, default_value_t = DEFAULT_MAX_SYSEX_LEN)]
    max_sysex_length: usize,

    /// Accept channel messages that omit a repeated status byte
    #[arg(long, default_value_t = false)]
    running_status: bool,
}

impl Options {
    fn framing(&self) -> FramingConfig {
        FramingConfig {
            sysex: self
                .sysex_length
                .map_or(SysexFraming::Terminated, SysexFraming::FixedLength),
            running_status: self.running_status,
            max_sysex_len: self.max_sysex_length,
        }
    }
}

pub fn run(opts: Options, common_opts: crate::CommonOptions) -> anyhow::Result<()> {
    if let Some(log_file) = common_opts
        .log
        .or_else(|| crate::locations::log_file("bridge"))
    {
        crate::logger::start("bridge", log_file, common_opts.verbose)?;
    }

    if opts.output.is_none() && opts.input.is_none() {
        anyhow::bail!("select a MIDI device with --output or --input");
    }

    if !is_standard_baud_rate(opts.baud) {
        log::warn!("{} is not a standard baud rate", opts.baud);
    }

    let mut bridge = BridgeController::new(
        Box::<HostSerialPorts>::default(),
        Box::<HostMidiDevices>::default(),
    )
    .with_framing(opts.framing());

    for change in [
        ConfigChange::SerialPort(Some(opts.port.clone())),
        ConfigChange::BaudRate(Some(opts.baud)),
        ConfigChange::MidiInput(opts.input.clone()),
        ConfigChange::MidiOutput(opts.output.clone()),
    ] {
        bridge.configure(change)?;
    }

    bridge.enable()?;

    let (interrupt_sender, interrupt_receiver) = crossbeam::channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        interrupt_sender.try_send(()).ok();
    })?;

    println!(
        "bridging {} @ {} -> {} (ctrl-c to stop)",
        opts.port,
        opts.baud,
        opts.output.as_deref().unwrap_or("no output")
    );

    while interrupt_receiver.try_recv().is_err() {
        match bridge.next_event(EVENT_POLL_INTERVAL) {
            Some(BridgeEvent::Received(command)) => {
                log::info!("{command}");
                println!("{command}");
            }
            Some(BridgeEvent::Dropped(reason)) => log::warn!("dropped : {reason}"),
            Some(BridgeEvent::TransportClosed(reason)) => {
                anyhow::bail!("bridge stopped, transport closed : {reason}")
            }
            None => (),
        }
    }

    bridge.disable();
    log::info!("bridge stopped");

    Ok(())
}
