use tokio::sync::watch;

pub struct ShutdownHandle {
    shutdown_signal_sender: watch::Sender<bool>,
}

/// Cloneable receiving side; every background task holds one.
#[derive(Clone)]
pub struct ShutdownSignal {
    shutdown_signal_receiver: watch::Receiver<bool>,
}

impl ShutdownHandle {
    pub fn new() -> (ShutdownHandle, ShutdownSignal) {
        let (shutdown_signal_sender, shutdown_signal_receiver) = watch::channel(false);
        return (ShutdownHandle { shutdown_signal_sender }, ShutdownSignal { shutdown_signal_receiver });
    }

    pub fn shutdown(&self) {
        self.shutdown_signal_sender.send_replace(true);
    }

    pub fn signal(&self) -> ShutdownSignal {
        return ShutdownSignal { shutdown_signal_receiver: self.shutdown_signal_sender.subscribe() };
    }
}

impl ShutdownSignal {
    pub fn is_shutdown(&self) -> bool {
        return *self.shutdown_signal_receiver.borrow();
    }

    /// Completes once shutdown is requested, or the handle is dropped.
    pub async fn wait(&mut self) {
        while !*self.shutdown_signal_receiver.borrow_and_update() {
            if self.shutdown_signal_receiver.changed().await.is_err() {
                return;
            }
        }
    }
}
