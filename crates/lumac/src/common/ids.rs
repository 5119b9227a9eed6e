//! Monotonic id generation
//!
//! Scopes, symbols and AST nodes are addressed by small integer handles
//! into arenas. Ids are never recycled within a pass; `reset` starts a
//! fresh numbering for the next one.

/// Monotonic counter handing out `u32` ids
#[derive(Debug, Default)]
pub struct IdGen {
    next: u32,
}

impl IdGen {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}
