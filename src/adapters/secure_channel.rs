//! Typed HDCP 2.2 commands over a [`SecureChannel`] transport.
//!
//! Each call encodes its fixed request layout, exchanges it through the
//! transport and validates the response before anything reaches the session:
//! transport result, status word, echoed command ID and, for commands that
//! produce a message, `0 < msglen <= MAX_TX_MESSAGE_SIZE`. Nothing is retried.
use log::{debug, error};

use crate::core::wire::{
    CommandId, GetTopologyReq, LibDeinitReq, LibInitReq, MessageResponse,
    QueryStreamTypeReq, RcvdMsgReq, Request, SendTimeoutReq, SetHwKeyReq, TxmtrDeinitReq,
    TxmtrInitReq, TxmtrResponse, UpdateSrmReq, decode_response, encode_request,
    response_capacity,
};
use crate::domain::message::{
    MAX_TOPOLOGY_ELEMS, MAX_TX_MESSAGE_SIZE, MessageBuf, MessageId, TxmtrSubstate,
};
use crate::domain::topology::{ReceiverInfo, Topology};
use crate::ports::secure_channel::{SecureChannel, SecureChannelError};

/// Message produced by the transmitter for the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxMessage {
    pub message: MessageBuf,
    /// Time the sink has to answer, in milliseconds.
    pub timeout_ms: u32,
}

/// Validated reply to `HDCP_TXMTR_PROCESS_RECEIVED_MESSAGE`.
///
/// `message` is `None` when the trusted application produced nothing to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedMessage {
    pub substate: TxmtrSubstate,
    pub timeout_ms: u32,
    pub message: Option<MessageBuf>,
}

impl ProcessedMessage {
    /// The reply announces a repeater: `SKE_Send_Eks` of exact size while the
    /// transmitter waits for a receiver ID list with a positive timeout.
    #[must_use]
    pub fn announces_repeater(&self) -> bool {
        self.message
            .as_ref()
            .is_some_and(|m| m.is(MessageId::SkeSendEks))
            && self.substate == TxmtrSubstate::WaitingForReceiverIdList
            && self.timeout_ms > 0
    }
}

/// Reply to `HDCP_TXMTR_SEND_MESSAGE_TIMEOUT`.
///
/// The trusted application answers either with its own command ID (nothing
/// left to do) or as if it processed a message, carrying a message to resend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutReply {
    pub responder: u32,
    pub timeout_ms: u32,
    pub message: Option<MessageBuf>,
}

impl TimeoutReply {
    /// `LC_Init` of exact size, returned as a processed message: resend it.
    #[must_use]
    pub fn lc_init_resend(&self) -> Option<&MessageBuf> {
        if self.responder != CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE.0 {
            return None;
        }
        self.message.as_ref().filter(|m| m.is(MessageId::LcInit))
    }
}

/// HDCP 2.2 transmitter commands bound to one transport.
pub struct TxmtrChannel<T: SecureChannel> {
    transport: T,
    app_name: String,
    buffer_size: usize,
    app_started: bool,
}

impl<T: SecureChannel> TxmtrChannel<T> {
    pub fn new(transport: T, app_name: impl Into<String>, buffer_size: usize) -> Self {
        Self {
            transport,
            app_name: app_name.into(),
            buffer_size,
            app_started: false,
        }
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn app_started(&self) -> bool {
        self.app_started
    }

    fn exchange<R: Request>(&mut self, req: &R) -> Result<R::Resp, SecureChannelError> {
        if !self.app_started {
            return Err(SecureChannelError::AppNotLoaded);
        }
        let request = encode_request(req);
        let capacity = response_capacity::<R>();
        let required = request.len() + capacity;
        if required > self.buffer_size {
            return Err(SecureChannelError::BufferTooSmall {
                required,
                capacity: self.buffer_size,
            });
        }
        let raw = self
            .transport
            .send_command(R::ID, &request, capacity)
            .inspect_err(|e| error!("{} transport failure: {e}", R::ID))?;
        Ok(decode_response::<R::Resp>(R::ID, &raw)?)
    }

    /// Exchange and check status plus echoed command ID.
    fn command<R: Request>(&mut self, req: &R) -> Result<R::Resp, SecureChannelError>
    where
        R::Resp: TxmtrResponse,
    {
        let rsp = self.exchange(req)?;
        check_status(R::ID, &rsp)?;
        check_command(R::ID, &rsp)?;
        Ok(rsp)
    }

    /// Start the trusted application and load the HDCP 2.2 library.
    ///
    /// The application is shut down again if the library fails to load.
    ///
    /// # Errors
    /// * `SecureChannelError::App` if the application cannot be started.
    /// * Any validation error of the `HDCP_LIB_INIT` response.
    pub fn load_library(&mut self) -> Result<(), SecureChannelError> {
        self.transport.start_app(&self.app_name, self.buffer_size)?;
        self.app_started = true;
        debug!("{} started", self.app_name);
        if let Err(e) = self.command(&LibInitReq::default()) {
            error!("library init failed: {e}");
            if let Err(e) = self.shutdown_app() {
                error!("{e}");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Unload the HDCP 2.2 library and shut the application down.
    ///
    /// The application is shut down even if `HDCP_LIB_DEINIT` fails; the
    /// first error is returned.
    ///
    /// # Errors
    /// * Validation error of the `HDCP_LIB_DEINIT` response.
    /// * `SecureChannelError::App` if shutdown fails.
    pub fn unload_library(&mut self) -> Result<(), SecureChannelError> {
        let deinit = self.command(&LibDeinitReq::default()).map(|_| ());
        let shutdown = self.shutdown_app();
        deinit.and(shutdown)
    }

    fn shutdown_app(&mut self) -> Result<(), SecureChannelError> {
        if !self.app_started {
            return Ok(());
        }
        self.app_started = false;
        self.transport.shutdown_app()
    }

    /// Create a transmitter context. Returns the context handle and the first
    /// message (`AKE_Init`).
    ///
    /// # Errors
    /// Any validation error of the `HDCP_TXMTR_INIT` response.
    pub fn txmtr_init(&mut self) -> Result<(u32, TxMessage), SecureChannelError> {
        let rsp = self.command(&TxmtrInitReq::default())?;
        let message = take_message(CommandId::TXMTR_INIT, &rsp)?;
        Ok((rsp.ctxhandle, message))
    }

    /// Release the transmitter context `ctx`.
    ///
    /// # Errors
    /// Any validation error of the `HDCP_TXMTR_DEINIT` response.
    pub fn txmtr_deinit(&mut self, ctx: u32) -> Result<(), SecureChannelError> {
        self.command(&TxmtrDeinitReq::new(ctx))?;
        debug!("context {ctx:#x} released");
        Ok(())
    }

    /// Hand a message received from the sink to the trusted application.
    ///
    /// Checks transport, status and command ID; an empty reply message is
    /// reported as `None` and left to the caller to judge.
    ///
    /// # Errors
    /// * Validation error of the response.
    /// * `SecureChannelError::MessageTooLarge` if `msglen` exceeds 129.
    pub fn process_received_message(
        &mut self,
        ctx: u32,
        message: &MessageBuf,
    ) -> Result<ProcessedMessage, SecureChannelError> {
        let rsp = self.command(&RcvdMsgReq::new(ctx, message.as_bytes()))?;
        Ok(ProcessedMessage {
            substate: TxmtrSubstate::from(rsp.flag),
            timeout_ms: rsp.timeout,
            message: optional_message(CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE, &rsp)?,
        })
    }

    /// Report that the sink missed its deadline.
    ///
    /// Only transport and status are checked here; the echoed command ID is
    /// part of the reply.
    ///
    /// # Errors
    /// * Transport or status failure.
    /// * `SecureChannelError::MessageTooLarge` if `msglen` exceeds 129.
    pub fn send_message_timeout(&mut self, ctx: u32) -> Result<TimeoutReply, SecureChannelError> {
        let rsp = self.exchange(&SendTimeoutReq::new(ctx))?;
        check_status(CommandId::TXMTR_SEND_MESSAGE_TIMEOUT, &rsp)?;
        Ok(TimeoutReply {
            responder: rsp.commandid,
            timeout_ms: rsp.timeout,
            message: optional_message(CommandId::TXMTR_SEND_MESSAGE_TIMEOUT, &rsp)?,
        })
    }

    /// Program the negotiated session key into the link hardware.
    ///
    /// # Errors
    /// Any validation error of the `HDCP_TXMTR_SET_HW_KEY` response.
    pub fn set_hw_key(&mut self, ctx: u32) -> Result<(), SecureChannelError> {
        self.command(&SetHwKeyReq::new(ctx)).map(|_| ())
    }

    /// Produce `RepeaterAuth_Stream_Manage` for the sink.
    ///
    /// # Errors
    /// Any validation error of the `HDCP_TXMTR_QUERY_STREAM_TYPE` response.
    pub fn query_stream_type(&mut self, ctx: u32) -> Result<TxMessage, SecureChannelError> {
        let rsp = self.command(&QueryStreamTypeReq::new(ctx))?;
        take_message(CommandId::TXMTR_QUERY_STREAM_TYPE, &rsp)
    }

    /// Read the downstream topology.
    ///
    /// # Errors
    /// * Any validation error of the `HDCP_TXMTR_GET_TOPOLOGY_INFO` response.
    /// * `SecureChannelError::TopologyOverflow` if more than 32 receivers are
    ///   listed.
    pub fn get_topology_info(&mut self, ctx: u32) -> Result<Topology, SecureChannelError> {
        let rsp = self.command(&GetTopologyReq::new(ctx))?;
        let info = rsp.topologyinfo;
        let overflow = || SecureChannelError::TopologyOverflow {
            count: info.num_rcvrs,
            max: MAX_TOPOLOGY_ELEMS,
        };
        let count = usize::try_from(info.num_rcvrs).map_err(|_| overflow())?;
        if count > MAX_TOPOLOGY_ELEMS {
            return Err(overflow());
        }
        let receivers = info.rcvinfo[..count]
            .iter()
            .map(|r| ReceiverInfo {
                receiver_id: r.rcvr_id,
                elem_type: r.elem_type,
                hdcp_version: r.hdcp_version,
            })
            .collect();
        Topology::new(receivers).ok_or_else(overflow)
    }

    /// Point the trusted application at a new SRM region.
    ///
    /// # Errors
    /// Any validation error of the `HDCP_TXMTR_UPDATE_SRM` response.
    pub fn update_srm(&mut self, ctx: u32, offset: u32, length: u32) -> Result<(), SecureChannelError> {
        self.command(&UpdateSrmReq::new(ctx, offset, length)).map(|_| ())
    }
}

fn check_status<Rsp: TxmtrResponse>(command: CommandId, rsp: &Rsp) -> Result<(), SecureChannelError> {
    match rsp.status() {
        0 => Ok(()),
        status => {
            error!("{command} failed with status {status:#x}");
            Err(SecureChannelError::Status { command, status })
        }
    }
}

fn check_command<Rsp: TxmtrResponse>(
    command: CommandId,
    rsp: &Rsp,
) -> Result<(), SecureChannelError> {
    if rsp.command_id() == command.0 {
        Ok(())
    } else {
        error!("{command}: response echoed {:#x}", rsp.command_id());
        Err(SecureChannelError::CommandMismatch {
            expected: command,
            actual: rsp.command_id(),
        })
    }
}

fn optional_message<Rsp: MessageResponse>(
    command: CommandId,
    rsp: &Rsp,
) -> Result<Option<MessageBuf>, SecureChannelError> {
    let len = rsp.msglen() as usize;
    if len == 0 {
        return Ok(None);
    }
    if len > MAX_TX_MESSAGE_SIZE {
        return Err(SecureChannelError::MessageTooLarge {
            command,
            len,
            max: MAX_TX_MESSAGE_SIZE,
        });
    }
    let message = MessageBuf::outbound(&rsp.message()[..len])?;
    debug!("recvd {} from TZ", message.name());
    Ok(Some(message))
}

fn take_message<Rsp: MessageResponse>(
    command: CommandId,
    rsp: &Rsp,
) -> Result<TxMessage, SecureChannelError> {
    let message =
        optional_message(command, rsp)?.ok_or(SecureChannelError::EmptyMessage(command))?;
    Ok(TxMessage {
        message,
        timeout_ms: rsp.timeout(),
    })
}
