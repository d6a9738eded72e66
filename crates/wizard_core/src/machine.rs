#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Moved { from: usize, to: usize },
    Blocked,
    Unchanged,
}

impl Transition {
    pub fn moved(self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepView {
    pub current: usize,
    pub total: usize,
    pub progress: Vec<bool>,
    pub panels: Vec<bool>,
    pub previous_visible: bool,
    pub next_visible: bool,
    pub submit_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepMachine {
    current: usize,
    total: usize,
}

impl StepMachine {
    pub fn new(total_steps: usize) -> Self {
        Self {
            current: 1,
            total: total_steps.max(1),
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_first(&self) -> bool {
        self.current == 1
    }

    pub fn is_last(&self) -> bool {
        self.current == self.total
    }

    pub fn advance_if(&mut self, guard: impl FnOnce(usize) -> bool) -> Transition {
        if self.is_last() {
            return Transition::Unchanged;
        }
        if !guard(self.current) {
            return Transition::Blocked;
        }
        self.move_to(self.current + 1)
    }

    pub fn retreat_with(&mut self, before: impl FnOnce()) -> Transition {
        if self.is_first() {
            return Transition::Unchanged;
        }
        before();
        self.move_to(self.current - 1)
    }

    pub fn reset(&mut self) -> Transition {
        if self.is_first() {
            return Transition::Unchanged;
        }
        self.move_to(1)
    }

    fn move_to(&mut self, to: usize) -> Transition {
        let from = self.current;
        self.current = to;
        tracing::debug!(from, to, total = self.total, "wizard step changed");
        Transition::Moved { from, to }
    }

    pub fn view(&self) -> StepView {
        let marks: Vec<bool> = (1..=self.total).map(|step| step == self.current).collect();
        StepView {
            current: self.current,
            total: self.total,
            progress: marks.clone(),
            panels: marks,
            previous_visible: !self.is_first(),
            next_visible: self.current < self.total,
            submit_visible: self.is_last(),
        }
    }
}
