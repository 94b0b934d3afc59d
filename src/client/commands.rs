use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// Console command asking the renderer to load a map
pub fn map_command(map_name: &str) -> String {
    format!("map {map_name}")
}

/// Create a connected sender/queue pair
pub fn command_queue() -> (CommandSender, CommandQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CommandSender { tx }, CommandQueue { rx })
}

/// Producer half, owned by the network task
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: UnboundedSender<String>,
}

impl CommandSender {
    /// Enqueue a command. Returns false once the consumer is gone.
    pub fn push(&self, command: impl Into<String>) -> bool {
        let command = command.into();
        debug!(%command, "queueing console command");
        self.tx.send(command).is_ok()
    }
}

/// Consumer half, drained by the render side at its own cadence
#[derive(Debug)]
pub struct CommandQueue {
    rx: UnboundedReceiver<String>,
}

impl CommandQueue {
    pub fn try_next(&mut self) -> Option<String> {
        match self.rx.try_recv() {
            Ok(command) => Some(command),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn drain(&mut self) -> Vec<String> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_drain() {
        let (tx, mut queue) = command_queue();
        assert!(queue.drain().is_empty());

        assert!(tx.push(map_command("svencoop1")));
        assert!(tx.push("map svencoop2"));
        assert_eq!(queue.drain(), vec!["map svencoop1", "map svencoop2"]);
        assert!(queue.try_next().is_none());
    }

    #[test]
    fn test_push_after_consumer_dropped() {
        let (tx, queue) = command_queue();
        drop(queue);
        assert!(!tx.push("map x"));
    }

    #[test]
    fn test_cross_thread() {
        let (tx, mut queue) = command_queue();
        std::thread::spawn(move || {
            tx.push(map_command("stadium4"));
        })
        .join()
        .unwrap();
        assert_eq!(queue.drain(), vec!["map stadium4"]);
    }
}
