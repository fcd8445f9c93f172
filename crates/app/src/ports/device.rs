//! Device command port: forwards resolved commands to the device.

use std::sync::Arc;

use tokio::sync::mpsc;

/// A command resolved from a bus message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Action identifier of the addressed control.
    pub action_id: String,
    /// Raw command string, passed through unchanged.
    pub command: String,
}

/// Sends commands to the device.
///
/// Delivery is fire-and-forget; implementations log their own failures.
pub trait DeviceCommandSink {
    fn send_command(&self, command: Command);
}

impl<T: DeviceCommandSink + ?Sized> DeviceCommandSink for Arc<T> {
    fn send_command(&self, command: Command) {
        (**self).send_command(command);
    }
}

impl DeviceCommandSink for mpsc::UnboundedSender<Command> {
    fn send_command(&self, command: Command) {
        let _ = self.send(command);
    }
}
