use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use zerocopy::{FromZeros, IntoBytes};

use crate::core::wire::{
    CommandId, DeinitRsp, GetTopologyRsp, Hdcp1KeySetRsp, Hdcp1SetEncRsp, InitRsp,
    QueryStreamTypeRsp, RcvdMsgRsp, SendTimeoutRsp,
};
use crate::domain::message::{HDCP1_AKSV_SIZE, MAX_TX_MESSAGE_SIZE, RCVR_ID_SIZE, TxmtrSubstate};
use crate::ports::secure_channel::{SecureChannel, SecureChannelError};

/// One scripted answer. Encoded with the response layout of whichever command
/// consumes it.
#[derive(Debug, Clone, Default)]
pub struct Reply {
    transport_rc: Option<i32>,
    status: u32,
    commandid: u32,
    ctx: u32,
    timeout: u32,
    flag: u32,
    msglen: Option<u32>,
    message: Vec<u8>,
    receivers: Vec<([u8; RCVR_ID_SIZE], u32, u32)>,
    ret: u32,
    ksv: [u8; HDCP1_AKSV_SIZE],
    delay: Option<Duration>,
}

impl Reply {
    /// Success echoing `command`, no message.
    pub fn ok(command: CommandId) -> Self {
        Self {
            commandid: command.0,
            ..Self::default()
        }
    }

    /// Success echoing `command` and carrying `message` with `timeout`.
    pub fn message(command: CommandId, message: &[u8], timeout: u32) -> Self {
        Self {
            commandid: command.0,
            timeout,
            message: message.to_vec(),
            ..Self::default()
        }
    }

    /// Transport-level failure with return code `rc`.
    pub fn transport_error(rc: i32) -> Self {
        Self {
            transport_rc: Some(rc),
            ..Self::default()
        }
    }

    /// `HDCP_TXMTR_GET_TOPOLOGY_INFO` answer listing `(id, elem_type, version)`.
    pub fn topology(receivers: &[([u8; RCVR_ID_SIZE], u32, u32)]) -> Self {
        Self {
            commandid: CommandId::TXMTR_GET_TOPOLOGY_INFO.0,
            receivers: receivers.to_vec(),
            ..Self::default()
        }
    }

    /// HDCP 1.x answer with `ret` and AKSV bytes.
    pub fn hdcp1(command: CommandId, ret: u32, ksv: [u8; HDCP1_AKSV_SIZE]) -> Self {
        Self {
            commandid: command.0,
            ret,
            ksv,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn status(mut self, status: u32) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn ctx(mut self, ctx: u32) -> Self {
        self.ctx = ctx;
        self
    }

    #[must_use]
    pub fn substate(mut self, substate: TxmtrSubstate) -> Self {
        self.flag = substate.into();
        self
    }

    /// Override the reported message length.
    #[must_use]
    pub fn msglen(mut self, msglen: u32) -> Self {
        self.msglen = Some(msglen);
        self
    }

    /// Sleep this long before answering.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn msg_array(&self) -> [u8; MAX_TX_MESSAGE_SIZE] {
        let mut out = [0u8; MAX_TX_MESSAGE_SIZE];
        let n = self.message.len().min(MAX_TX_MESSAGE_SIZE);
        out[..n].copy_from_slice(&self.message[..n]);
        out
    }

    fn len(&self) -> u32 {
        self.msglen.unwrap_or(self.message.len() as u32)
    }

    fn encode(&self, request: CommandId) -> Vec<u8> {
        match request {
            CommandId::LIB_INIT | CommandId::TXMTR_INIT => InitRsp {
                status: self.status,
                commandid: self.commandid,
                ctxhandle: self.ctx,
                timeout: self.timeout,
                msglen: self.len(),
                message: self.msg_array(),
            }
            .as_bytes()
            .to_vec(),
            CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE => RcvdMsgRsp {
                status: self.status,
                commandid: self.commandid,
                state: 0,
                timeout: self.timeout,
                flag: self.flag,
                msglen: self.len(),
                msg: self.msg_array(),
            }
            .as_bytes()
            .to_vec(),
            CommandId::TXMTR_SEND_MESSAGE_TIMEOUT => SendTimeoutRsp {
                status: self.status,
                commandid: self.commandid,
                timeout: self.timeout,
                msglen: self.len(),
                message: self.msg_array(),
            }
            .as_bytes()
            .to_vec(),
            CommandId::TXMTR_QUERY_STREAM_TYPE => QueryStreamTypeRsp {
                status: self.status,
                commandid: self.commandid,
                timeout: self.timeout,
                msglen: self.len(),
                msg: self.msg_array(),
            }
            .as_bytes()
            .to_vec(),
            CommandId::TXMTR_GET_TOPOLOGY_INFO => {
                let mut rsp = GetTopologyRsp::new_zeroed();
                rsp.status = self.status;
                rsp.commandid = self.commandid;
                let mut info = rsp.topologyinfo;
                info.num_rcvrs = self.receivers.len() as u32;
                for (slot, (id, elem_type, version)) in
                    info.rcvinfo.iter_mut().zip(self.receivers.iter())
                {
                    slot.rcvr_id = *id;
                    slot.elem_type = *elem_type;
                    slot.hdcp_version = *version;
                }
                rsp.topologyinfo = info;
                rsp.as_bytes().to_vec()
            }
            CommandId::HDCP1_SET_KEY => Hdcp1KeySetRsp {
                commandid: self.commandid,
                ret: self.ret,
                ksv: self.ksv,
            }
            .as_bytes()
            .to_vec(),
            CommandId::HDCP1_SET_ENC => Hdcp1SetEncRsp {
                commandid: self.commandid,
                ret: self.ret,
            }
            .as_bytes()
            .to_vec(),
            _ => DeinitRsp {
                status: self.status,
                commandid: self.commandid,
            }
            .as_bytes()
            .to_vec(),
        }
    }
}

/// One request observed by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentCommand {
    pub command: CommandId,
    pub request: Vec<u8>,
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Reply>,
    sent: Vec<SentCommand>,
    app_running: bool,
    app_name: Option<String>,
    start_failures: VecDeque<i32>,
    starts: usize,
    shutdowns: usize,
    in_flight: usize,
    max_in_flight: usize,
    latency: Option<Duration>,
}

/// Scripted stand-in for the trusted application.
///
/// Clones share the same script, so a test keeps one clone to inspect what
/// the session sent while the session owns another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedChannel {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ScriptedChannel::push`].
    #[must_use]
    pub fn then(self, reply: Reply) -> Self {
        self.push(reply);
        self
    }

    /// Queue `reply` behind the already scripted ones.
    pub fn push(&self, reply: Reply) {
        self.lock().replies.push_back(reply);
    }

    /// Make the next `start_app` fail with `rc`.
    pub fn fail_next_start(&self, rc: i32) {
        self.lock().start_failures.push_back(rc);
    }

    pub fn sent(&self) -> Vec<SentCommand> {
        self.lock().sent.clone()
    }

    pub fn commands(&self) -> Vec<CommandId> {
        self.lock().sent.iter().map(|s| s.command).collect()
    }

    pub fn clear_sent(&self) {
        self.lock().sent.clear();
    }

    pub fn app_running(&self) -> bool {
        self.lock().app_running
    }

    pub fn app_name(&self) -> Option<String> {
        self.lock().app_name.clone()
    }

    pub fn starts(&self) -> usize {
        self.lock().starts
    }

    pub fn shutdowns(&self) -> usize {
        self.lock().shutdowns
    }

    /// Sleep this long inside every `send_command`.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = Some(latency);
    }

    /// Highest number of overlapping `send_command` calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    pub fn remaining_replies(&self) -> usize {
        self.lock().replies.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SecureChannel for ScriptedChannel {
    fn start_app(&mut self, app_name: &str, _buffer_size: usize) -> Result<(), SecureChannelError> {
        let mut s = self.lock();
        if let Some(rc) = s.start_failures.pop_front() {
            return Err(SecureChannelError::App {
                app: app_name.to_owned(),
                action: "started",
                rc,
            });
        }
        s.starts += 1;
        s.app_running = true;
        s.app_name = Some(app_name.to_owned());
        Ok(())
    }

    fn shutdown_app(&mut self) -> Result<(), SecureChannelError> {
        let mut s = self.lock();
        s.shutdowns += 1;
        s.app_running = false;
        Ok(())
    }

    fn send_command(
        &mut self,
        command: CommandId,
        request: &[u8],
        response_capacity: usize,
    ) -> Result<Vec<u8>, SecureChannelError> {
        let (reply, latency) = {
            let mut s = self.lock();
            if !s.app_running {
                return Err(SecureChannelError::AppNotLoaded);
            }
            s.sent.push(SentCommand {
                command,
                request: request.to_vec(),
            });
            s.in_flight += 1;
            s.max_in_flight = s.max_in_flight.max(s.in_flight);
            let reply = s.replies.pop_front().unwrap_or_else(|| Reply::ok(command));
            (reply, s.latency)
        };
        if let Some(d) = reply.delay.or(latency) {
            thread::sleep(d);
        }
        self.lock().in_flight -= 1;
        if let Some(rc) = reply.transport_rc {
            return Err(SecureChannelError::Transport { command, rc });
        }
        let mut raw = reply.encode(command);
        raw.resize(raw.len().max(response_capacity), 0);
        Ok(raw)
    }
}
