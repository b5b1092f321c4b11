//! Full authentications through the public API, steps run on the caller.

use std::sync::Arc;
use std::time::Duration;

use hdcp_session::application::SessionPhase;
use hdcp_session::core::wire::CommandId;
use hdcp_session::domain::message::{MessageId, SKE_SEND_EKS_MESSAGE_SIZE, TxmtrSubstate};
use hdcp_session::test_support::{RecordingClient, Reply, ScriptedChannel};
use hdcp_session::{
    ClientNotification, HdcpLibrary, NotificationCode, SessionConfig, WakeupCommand, WakeupData,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn msg(id: MessageId, len: usize) -> Vec<u8> {
    let mut m = vec![id.raw()];
    m.resize(len, 0x3c);
    m
}

fn config() -> SessionConfig {
    SessionConfig {
        hw_key_delay_ms: 200,
        ..SessionConfig::tethered()
    }
}

/// What the fake HDMI layer does with a notification: the message to "send"
/// and whether a receive is expected.
fn outgoing(n: &ClientNotification) -> Option<Vec<u8>> {
    match n {
        ClientNotification::SendMessage { message, .. } => Some(message.as_bytes().to_vec()),
        _ => None,
    }
}

#[test]
fn receiver_with_stored_km_authenticates() {
    init_logging();
    let tz = ScriptedChannel::new()
        .then(Reply::ok(CommandId::LIB_INIT))
        .then(Reply::message(CommandId::TXMTR_INIT, &msg(MessageId::AkeInit, 12), 100).ctx(9))
        // AKE_Send_Cert -> AKE_Stored_km
        .then(Reply::message(
            CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE,
            &msg(MessageId::AkeStoredKm, 33),
            200,
        ))
        // AKE_Send_H_prime -> LC_Init
        .then(Reply::message(
            CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE,
            &msg(MessageId::LcInit, 9),
            20,
        ))
        // LC_Send_L_prime -> SKE_Send_Eks
        .then(Reply::message(
            CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE,
            &msg(MessageId::SkeSendEks, SKE_SEND_EKS_MESSAGE_SIZE),
            0,
        ))
        .then(Reply::ok(CommandId::TXMTR_SET_HW_KEY));
    let client = RecordingClient::new();
    let lib = HdcpLibrary::register(tz.clone(), Arc::new(client.clone()), config()).unwrap();

    lib.wakeup(WakeupCommand::Start.into()).unwrap();
    for sink_msg in [
        msg(MessageId::AkeSendCert, 524),
        msg(MessageId::AkeSendHPrime, 33),
        msg(MessageId::LcSendLPrime, 33),
    ] {
        lib.wakeup(WakeupCommand::MessageSendSuccess.into()).unwrap();
        lib.wakeup(WakeupData::received(&sink_msg)).unwrap();
    }
    lib.wakeup(WakeupCommand::MessageSendSuccess.into()).unwrap();

    use NotificationCode::*;
    assert_eq!(
        client.codes(),
        vec![
            SendMessage,
            ReceiveMessage,
            SendMessage,
            ReceiveMessage,
            SendMessage,
            ReceiveMessage,
            SendMessage,
            StatusSuccess,
            LinkPoll
        ]
    );
    let sent: Vec<u8> = client
        .notifications()
        .iter()
        .filter_map(outgoing)
        .map(|m| m[0])
        .collect();
    assert_eq!(
        sent,
        vec![
            MessageId::AkeInit.raw(),
            MessageId::AkeStoredKm.raw(),
            MessageId::LcInit.raw(),
            MessageId::SkeSendEks.raw()
        ]
    );
    assert_eq!(tz.remaining_replies(), 0);

    let snap = lib.snapshot();
    assert!(snap.active && snap.flags.authenticated);
    assert_eq!(snap.phase, SessionPhase::Authenticated);
    assert_eq!(snap.context_handle, Some(9));

    lib.wakeup(WakeupCommand::Stop.into()).unwrap();
    assert_eq!(client.count(StatusFailed), 0);
    assert!(!tz.app_running());
}

#[test]
fn repeater_topology_is_queryable_after_authentication() {
    init_logging();
    let tz = ScriptedChannel::new()
        .then(Reply::ok(CommandId::LIB_INIT))
        .then(Reply::message(CommandId::TXMTR_INIT, &msg(MessageId::AkeInit, 12), 100).ctx(3))
        .then(
            Reply::message(
                CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE,
                &msg(MessageId::SkeSendEks, SKE_SEND_EKS_MESSAGE_SIZE),
                3000,
            )
            .substate(TxmtrSubstate::WaitingForReceiverIdList),
        )
        .then(Reply::ok(CommandId::TXMTR_SET_HW_KEY))
        .then(Reply::message(
            CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE,
            &msg(MessageId::RepeaterAuthSendAck, 17),
            0,
        ))
        .then(Reply::message(
            CommandId::TXMTR_QUERY_STREAM_TYPE,
            &msg(MessageId::RepeaterAuthStreamManage, 6),
            100,
        ))
        .then(Reply::topology(&[([0xaa, 1, 2, 3, 4], 0, 2)]));
    let client = RecordingClient::new();
    let lib = HdcpLibrary::register(tz.clone(), Arc::new(client.clone()), config()).unwrap();

    lib.wakeup(WakeupCommand::Start.into()).unwrap();
    lib.wakeup(WakeupData::received(&msg(MessageId::LcSendLPrime, 33)))
        .unwrap();
    lib.wakeup(WakeupCommand::MessageSendSuccess.into()).unwrap();
    assert!(client.wait_for_code(NotificationCode::LinkPoll, Duration::from_secs(1)));

    lib.wakeup(WakeupData::received(&msg(
        MessageId::RepeaterAuthSendReceiverIdList,
        22,
    )))
    .unwrap();
    lib.wakeup(WakeupCommand::MessageSendSuccess.into()).unwrap();

    let last = client.notifications().last().and_then(outgoing).unwrap();
    assert_eq!(last[0], MessageId::RepeaterAuthStreamManage.raw());

    let topology = lib.topology_info().unwrap();
    assert_eq!(topology.len(), 1);
    assert_eq!(topology.receivers()[0].receiver_id[0], 0xaa);
    assert_eq!(client.count(NotificationCode::StatusFailed), 0);
}

#[test]
fn reentrant_client_drives_session_from_callback() {
    use std::sync::{Mutex, Weak};

    use hdcp_session::{ClientNotifier, NotifyError};

    /// Confirms every send from inside the callback.
    struct EagerClient {
        lib: Mutex<Weak<HdcpLibrary<ScriptedChannel>>>,
        seen: RecordingClient,
    }

    impl ClientNotifier for EagerClient {
        fn notify(&self, n: &ClientNotification) -> Result<(), NotifyError> {
            self.seen.notify(n)?;
            if n.code() == NotificationCode::SendMessage {
                let lib = self.lib.lock().unwrap().upgrade();
                if let Some(lib) = lib {
                    lib.wakeup(WakeupData::new(WakeupCommand::MessageSendSuccess).with_timeout(40))
                        .map_err(|e| NotifyError::Rejected(e.to_string()))?;
                }
            }
            Ok(())
        }
    }

    init_logging();
    let tz = ScriptedChannel::new()
        .then(Reply::ok(CommandId::LIB_INIT))
        .then(Reply::message(CommandId::TXMTR_INIT, &msg(MessageId::AkeInit, 12), 100).ctx(1));
    let client = Arc::new(EagerClient {
        lib: Mutex::new(Weak::new()),
        seen: RecordingClient::new(),
    });
    let lib = Arc::new(HdcpLibrary::register(tz, client.clone(), config()).unwrap());
    *client.lib.lock().unwrap() = Arc::downgrade(&lib);

    lib.wakeup(WakeupCommand::Start.into()).unwrap();
    assert_eq!(
        client.seen.notifications(),
        vec![
            ClientNotification::SendMessage {
                message: hdcp_session::domain::message::MessageBuf::outbound(&msg(
                    MessageId::AkeInit,
                    12
                ))
                .unwrap(),
                timeout_ms: 100,
            },
            ClientNotification::ReceiveMessage { timeout_ms: 40 },
        ]
    );
}
