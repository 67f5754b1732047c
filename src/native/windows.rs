use crate::cancel::{self, InterruptError};
use log::debug;
use windows_sys::Win32::Foundation::{BOOL, FALSE, GetLastError, TRUE};
use windows_sys::Win32::System::Console::{CTRL_BREAK_EVENT, CTRL_C_EVENT, SetConsoleCtrlHandler};

unsafe extern "system" fn handle_ctrl(ctrl_type: u32) -> BOOL {
    match ctrl_type {
        CTRL_C_EVENT | CTRL_BREAK_EVENT => {
            cancel::interrupt();
            TRUE
        }
        _ => FALSE,
    }
}

pub(crate) fn install_interrupt_handler() -> Result<(), InterruptError> {
    // SAFETY: the handler only stores into an atomic.
    if unsafe { SetConsoleCtrlHandler(Some(handle_ctrl), TRUE) } == 0 {
        return Err(InterruptError {
            code: unsafe { GetLastError() },
        });
    }
    debug!("installed the console control handler");
    Ok(())
}
