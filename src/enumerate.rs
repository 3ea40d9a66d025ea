use std::path::Path;

use crate::config;
use crate::persistence::{FileStore, Persistence};

pub fn midi() -> anyhow::Result<()> {
    // Suppress ALSA noise on stderr while the client is created
    let stderr_guard = suppress_stderr();
    let midi_out = midir::MidiOutput::new("stomp-enumerate")?;
    let ports = midi_out.ports();
    drop(stderr_guard);

    println!("=== MIDI Output Devices ===");
    if ports.is_empty() {
        println!("  (none found)");
    }
    for port in &ports {
        let name = midi_out.port_name(port).unwrap_or_else(|_| "Unknown".into());
        println!("  {name}");
    }
    Ok(())
}

pub fn setlists(config_path: &Path) -> anyhow::Result<()> {
    let config = config::load(config_path)?;
    let store = FileStore::new(config_path, &config);
    let current = config.current.setlist.as_deref();

    println!("=== Setlists ===");
    let names = store.list_setlists()?;
    if names.is_empty() {
        println!("  (none found)");
    }
    for name in &names {
        let marker = if current == Some(name.as_str()) { " *" } else { "" };
        println!("  {name}{marker}");
    }
    Ok(())
}

/// Temporarily redirect stderr to /dev/null to suppress ALSA library spam.
/// Returns a guard that restores stderr on drop. No-op on non-Unix platforms.
#[cfg(unix)]
fn suppress_stderr() -> Option<StderrGuard> {
    use std::os::unix::io::AsRawFd;
    let devnull = std::fs::File::open("/dev/null").ok()?;
    let stderr_fd = std::io::stderr().as_raw_fd();
    let saved = unsafe { libc::dup(stderr_fd) };
    if saved < 0 {
        return None;
    }
    unsafe { libc::dup2(devnull.as_raw_fd(), stderr_fd) };
    Some(StderrGuard { saved_fd: saved })
}

#[cfg(unix)]
struct StderrGuard {
    saved_fd: i32,
}

#[cfg(unix)]
impl Drop for StderrGuard {
    fn drop(&mut self) {
        use std::os::unix::io::AsRawFd;
        let stderr_fd = std::io::stderr().as_raw_fd();
        unsafe {
            libc::dup2(self.saved_fd, stderr_fd);
            libc::close(self.saved_fd);
        }
    }
}

#[cfg(not(unix))]
fn suppress_stderr() -> Option<()> {
    None
}
