use crate::cancel::{self, InterruptError};
use log::debug;
use nix::libc::c_int;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

extern "C" fn handle_sigint(_signal: c_int) {
    cancel::interrupt();
}

pub(crate) fn install_interrupt_handler() -> Result<(), InterruptError> {
    let action = SigAction::new(
        SigHandler::Handler(handle_sigint),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    // SAFETY: the handler only stores into an atomic, which is async-signal-safe.
    unsafe { sigaction(Signal::SIGINT, &action) }.map_err(|errno| InterruptError { errno })?;
    debug!("installed the SIGINT handler");
    Ok(())
}
