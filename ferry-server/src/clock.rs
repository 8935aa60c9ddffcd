//! Wall-clock source for message timestamps

/// Supplies the `HH:MM:SS` prefix stamped on relayed text
pub trait Clock: Send + Sync {
    fn now_hms(&self) -> String;
}

/// Local time from the system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_hms(&self) -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }
}

/// Always reports the same time
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

#[cfg(test)]
impl Clock for FixedClock {
    fn now_hms(&self) -> String {
        self.0.clone()
    }
}
