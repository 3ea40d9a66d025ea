use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use midir::{MidiOutput, MidiOutputConnection};

/// Outgoing channel messages. Channels are 1-based as printed on pedals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
    },
    ProgramChange {
        channel: u8,
        program: u8,
    },
}

impl MidiMessage {
    pub fn bytes(&self) -> Vec<u8> {
        match *self {
            MidiMessage::ControlChange {
                channel,
                controller,
                value,
            } => vec![0xB0 | channel_nibble(channel), controller & 0x7F, value & 0x7F],
            MidiMessage::ProgramChange { channel, program } => {
                vec![0xC0 | channel_nibble(channel), program & 0x7F]
            }
        }
    }
}

fn channel_nibble(channel: u8) -> u8 {
    channel.saturating_sub(1) & 0x0F
}

/// Owns the MIDI output connection on its own thread. Pedals only hold a
/// `Sender`, so a slow port never blocks navigation.
pub struct MidiOutputThread {
    handle: Option<JoinHandle<()>>,
}

impl MidiOutputThread {
    /// Open the first output port whose name contains `port_filter`, or the
    /// first port at all. Without a port the messages are only logged.
    pub fn start(
        port_filter: Option<&str>,
        dry_run: bool,
    ) -> anyhow::Result<(Self, Sender<MidiMessage>)> {
        let (tx, rx) = crossbeam_channel::bounded::<MidiMessage>(256);
        let connection = if dry_run {
            log::info!("MIDI output disabled; messages are logged only");
            None
        } else {
            open_port(port_filter)?
        };
        let handle = std::thread::Builder::new()
            .name("midi-out".into())
            .spawn(move || run(connection, rx))?;
        Ok((
            Self {
                handle: Some(handle),
            },
            tx,
        ))
    }

    /// Wait for queued messages to drain. All senders must be dropped first.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("MIDI output thread panicked");
            }
        }
    }
}

fn open_port(port_filter: Option<&str>) -> anyhow::Result<Option<MidiOutputConnection>> {
    let midi_out = MidiOutput::new("stomp")?;
    let ports = midi_out.ports();
    let found = ports.iter().find_map(|port| {
        let name = midi_out.port_name(port).ok()?;
        match port_filter {
            Some(filter) if !name.contains(filter) => None,
            _ => Some((port.clone(), name)),
        }
    });
    let Some((port, name)) = found else {
        log::warn!(
            "No MIDI output matching {:?}; messages are logged only",
            port_filter.unwrap_or("(any)")
        );
        return Ok(None);
    };
    match midi_out.connect(&port, "stomp-out") {
        Ok(conn) => {
            log::info!("Opened MIDI output: {name}");
            Ok(Some(conn))
        }
        Err(e) => anyhow::bail!("failed to open MIDI output {name}: {e}"),
    }
}

fn run(mut connection: Option<MidiOutputConnection>, rx: Receiver<MidiMessage>) {
    for message in rx {
        let bytes = message.bytes();
        match connection.as_mut() {
            Some(conn) => {
                if let Err(e) = conn.send(&bytes) {
                    log::warn!("MIDI send failed for {message:?}: {e}");
                } else {
                    log::debug!("MIDI out {bytes:02x?}");
                }
            }
            None => log::info!("MIDI out (dry run) {message:?} {bytes:02x?}"),
        }
    }
    if let Some(conn) = connection {
        let _ = conn.close();
    }
}
