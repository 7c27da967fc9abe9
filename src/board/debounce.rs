/// Cancel-and-restart timer: every `schedule` pushes the deadline out again.
#[derive(Debug)]
pub(crate) struct Debouncer {
    delay: f64,
    deadline: Option<f64>,
}

impl Debouncer {
    pub fn new(delay: f64) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now: f64) {
        self.deadline = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<f64> {
        self.deadline
    }

    /// True once, when the deadline has passed.
    pub fn poll(&mut self, now: f64) -> bool {
        if self.deadline.is_some_and(|deadline| now >= deadline) {
            self.deadline = None;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
