//! Indirect-threaded dispatch.
//!
//! Every handler runs its instruction and then fetches, decodes and hooks
//! the next one itself, handing back the next handler taken from the
//! [`DispatchTable`]. The driver only bounces between handlers, so there
//! is no shared decode branch.

use super::fault::{Fault, Outcome};
use super::host::Host;
use super::instruction::Opcode;
use super::machine::{Machine, Route, route};
use super::trace::TraceMode;

pub type Handler<H, T> = for<'m> fn(&mut Machine<'m, H, T>, &DispatchTable<H, T>) -> Next<H, T>;

/// What a handler hands back to the driver.
pub enum Next<H, T> {
    Go(Handler<H, T>),
    Done(Outcome),
}

/// One handler per opcode byte. Built once per engine and trace level.
pub struct DispatchTable<H, T> {
    handlers: [Handler<H, T>; 256],
}

impl<H: Host, T: TraceMode> DispatchTable<H, T> {
    pub fn new() -> Self {
        let handlers = std::array::from_fn(|byte| match route(Opcode(byte as u8)) {
            Route::Stop => stop::<H, T> as Handler<H, T>,
            Route::Push => push::<H, T>,
            Route::PushPooled => push_pooled::<H, T>,
            Route::Jump => jump::<H, T>,
            Route::JumpI => jumpi::<H, T>,
            Route::JumpConst => jump_const::<H, T>,
            Route::JumpConstI => jumpi_const::<H, T>,
            Route::JumpDest => jumpdest::<H, T>,
            Route::Pc => pc::<H, T>,
            Route::Return => ret::<H, T>,
            Route::Revert => revert::<H, T>,
            Route::Suicide => suicide::<H, T>,
            Route::Delegate => delegate::<H, T>,
            Route::Invalid => invalid::<H, T>,
        });
        Self { handlers }
    }

    #[inline(always)]
    fn get(&self, op: Opcode) -> Handler<H, T> {
        self.handlers[op.0 as usize]
    }
}

impl<H: Host, T: TraceMode> Default for DispatchTable<H, T> {
    fn default() -> Self {
        Self::new()
    }
}

pub fn run<H: Host, T: TraceMode>(m: &mut Machine<'_, H, T>, table: &DispatchTable<H, T>) -> Outcome {
    let mut next = dispatch(m, table);
    loop {
        match next {
            Next::Go(handler) => next = handler(m, table),
            Next::Done(outcome) => return outcome,
        }
    }
}

#[inline(always)]
fn dispatch<H: Host, T: TraceMode>(m: &mut Machine<'_, H, T>, table: &DispatchTable<H, T>) -> Next<H, T> {
    match m.fetch() {
        Ok(op) => Next::Go(table.get(op)),
        Err(fault) => Next::Done(Outcome::Faulted(fault)),
    }
}

#[inline(always)]
fn finish<H, T>(result: Result<Outcome, Fault>) -> Next<H, T> {
    Next::Done(result.unwrap_or_else(Outcome::Faulted))
}

/// Handler for an instruction that falls through to the next fetch.
macro_rules! handler {
    ($name:ident, |$m:ident| $effect:expr) => {
        fn $name<H: Host, T: TraceMode>(
            $m: &mut Machine<'_, H, T>,
            table: &DispatchTable<H, T>,
        ) -> Next<H, T> {
            match $effect {
                Ok(()) => dispatch($m, table),
                Err(fault) => Next::Done(Outcome::Faulted(fault)),
            }
        }
    };
}

/// Handler for an instruction that always ends the run.
macro_rules! terminal {
    ($name:ident, |$m:ident| $effect:expr) => {
        fn $name<H: Host, T: TraceMode>(
            $m: &mut Machine<'_, H, T>,
            _table: &DispatchTable<H, T>,
        ) -> Next<H, T> {
            finish($effect)
        }
    };
}

handler!(push, |m| {
    let op = m.current();
    m.op_push(op)
});
handler!(push_pooled, |m| m.op_push_pooled());
handler!(jump, |m| m.op_jump());
handler!(jumpi, |m| m.op_jumpi());
handler!(jump_const, |m| m.op_jump_const());
handler!(jumpi_const, |m| m.op_jumpi_const());
handler!(jumpdest, |m| m.op_jumpdest());
handler!(pc, |m| m.op_pc());
handler!(delegate, |m| {
    let op = m.current();
    m.op_delegate(op)
});

terminal!(stop, |m| m.op_stop());
terminal!(ret, |m| m.op_return());
terminal!(revert, |m| m.op_revert());
terminal!(suicide, |m| m.op_suicide());
terminal!(invalid, |m| m.op_invalid());
