//! HDCP 1.x key and encryption commands.
//!
//! The HDCP 1.x trusted application has no session state machine: a client
//! loads it once, asks it to program the device keys (receiving the AKSV) and
//! toggles link encryption. [`Hdcp1Keys`] owns the transport for that
//! application; there is no process-wide handle.
use log::{debug, error};
use thiserror::Error;

use crate::core::wire::{
    CommandId, Hdcp1KeySetReq, Hdcp1SetEncReq, QSEECOM_SBUFF_SIZE, Request, decode_response,
    encode_request, response_capacity,
};
use crate::ports::secure_channel::{SecureChannel, SecureChannelError};

/// Trusted application name of the HDCP 1.x service.
pub const HDCP1_APP_NAME: &str = "hdcp1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Hdcp1Error {
    /// The HDCP 1.x application could not be started.
    #[error("HDCP 1.x not supported: {0}")]
    Unsupported(SecureChannelError),

    /// Key programming refused (`ret` from the application).
    #[error("set key failed, ret {ret}")]
    NoKey { ret: u32 },

    #[error("{command} failed, ret {ret}")]
    Command { command: CommandId, ret: u32 },

    #[error(transparent)]
    Channel(#[from] SecureChannelError),
}

/// Loaded HDCP 1.x application.
pub struct Hdcp1Keys<T: SecureChannel> {
    transport: T,
}

impl<T: SecureChannel> Hdcp1Keys<T> {
    /// Start the HDCP 1.x application on `transport`.
    ///
    /// # Errors
    /// * `Hdcp1Error::Unsupported` if the application cannot be started.
    pub fn load(mut transport: T) -> Result<Self, Hdcp1Error> {
        transport
            .start_app(HDCP1_APP_NAME, QSEECOM_SBUFF_SIZE)
            .map_err(|e| {
                error!("{HDCP1_APP_NAME} start failed: {e}");
                Hdcp1Error::Unsupported(e)
            })?;
        debug!("{HDCP1_APP_NAME} loaded");
        Ok(Self { transport })
    }

    fn exchange<R: Request>(&mut self, req: &R) -> Result<R::Resp, SecureChannelError> {
        let raw = self
            .transport
            .send_command(R::ID, &encode_request(req), response_capacity::<R>())?;
        Ok(decode_response::<R::Resp>(R::ID, &raw)?)
    }

    /// Program the HDCP 1.x keys and return the AKSV as big-endian
    /// `(msb, lsb)` words.
    ///
    /// # Errors
    /// * `Hdcp1Error::NoKey` if the application refuses.
    /// * `Hdcp1Error::Channel` on transport or layout failure.
    pub fn set_keys(&mut self) -> Result<(u32, u32), Hdcp1Error> {
        let rsp = self.exchange(&Hdcp1KeySetReq::default())?;
        check_echo(CommandId::HDCP1_SET_KEY, rsp.commandid)?;
        if rsp.ret != 0 {
            error!("set key cmd failed, ret {}", { rsp.ret });
            return Err(Hdcp1Error::NoKey { ret: rsp.ret });
        }
        let ksv = rsp.ksv;
        let msb = u32::from_be_bytes([ksv[0], ksv[1], ksv[2], ksv[3]]);
        let lsb = u32::from_be_bytes([ksv[4], ksv[5], ksv[6], ksv[7]]);
        Ok((msb, lsb))
    }

    /// Enable or disable HDCP 1.x link encryption.
    ///
    /// # Errors
    /// * `Hdcp1Error::Command` if the application refuses.
    /// * `Hdcp1Error::Channel` on transport or layout failure.
    pub fn set_encryption(&mut self, enable: bool) -> Result<(), Hdcp1Error> {
        let rsp = self.exchange(&Hdcp1SetEncReq::new(enable))?;
        check_echo(CommandId::HDCP1_SET_ENC, rsp.commandid)?;
        match rsp.ret {
            0 => {
                debug!("encryption {}", if enable { "enabled" } else { "disabled" });
                Ok(())
            }
            ret => Err(Hdcp1Error::Command {
                command: CommandId::HDCP1_SET_ENC,
                ret,
            }),
        }
    }
}

fn check_echo(expected: CommandId, actual: u32) -> Result<(), SecureChannelError> {
    if actual == expected.0 {
        Ok(())
    } else {
        Err(SecureChannelError::CommandMismatch { expected, actual })
    }
}

impl<T: SecureChannel> Drop for Hdcp1Keys<T> {
    fn drop(&mut self) {
        if let Err(e) = self.transport.shutdown_app() {
            error!("{HDCP1_APP_NAME} shutdown failed: {e}");
        }
    }
}
