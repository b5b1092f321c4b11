use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::core::dispatch::ExecutionMode;
use crate::core::wire::CommandId;
use crate::domain::message::{MessageError, MessageId, SKE_SEND_EKS_MESSAGE_SIZE, TxmtrSubstate};
use crate::ports::client::{ClientNotification, NotificationCode};
use crate::ports::secure_channel::SecureChannelError;
use crate::test_support::{RecordingClient, Reply, ScriptedChannel, init_logging};

const CTX: u32 = 0x42;
const WAIT: Duration = Duration::from_secs(3);

fn msg(id: MessageId, len: usize) -> Vec<u8> {
    let mut m = vec![id.raw()];
    m.resize(len, 0xa5);
    m
}

fn ske_send_eks() -> Vec<u8> {
    msg(MessageId::SkeSendEks, SKE_SEND_EKS_MESSAGE_SIZE)
}

fn config() -> SessionConfig {
    SessionConfig {
        hw_key_delay_ms: MIN_HW_KEY_DELAY_MS,
        ..SessionConfig::tethered()
    }
}

fn start_script() -> ScriptedChannel {
    ScriptedChannel::new()
        .then(Reply::ok(CommandId::LIB_INIT))
        .then(Reply::message(CommandId::TXMTR_INIT, &msg(MessageId::AkeInit, 12), 200).ctx(CTX))
}

struct Harness {
    lib: HdcpLibrary<ScriptedChannel>,
    tz: ScriptedChannel,
    client: RecordingClient,
}

impl Harness {
    fn new(tz: ScriptedChannel, config: SessionConfig) -> Self {
        init_logging();
        let client = RecordingClient::new();
        let lib = HdcpLibrary::register(tz.clone(), Arc::new(client.clone()), config).unwrap();
        Self { lib, tz, client }
    }

    /// Session past `Start`, with the start traffic forgotten.
    fn started(config: SessionConfig) -> Self {
        let h = Self::new(start_script(), config);
        h.wake(WakeupCommand::Start);
        assert_eq!(h.client.codes(), vec![NotificationCode::SendMessage]);
        h.client.clear();
        h.tz.clear_sent();
        h
    }

    fn wake(&self, command: WakeupCommand) {
        self.lib.wakeup(command.into()).unwrap();
    }

    fn sent_with(&self, timeout_ms: u32) {
        self.lib
            .wakeup(WakeupData::new(WakeupCommand::MessageSendSuccess).with_timeout(timeout_ms))
            .unwrap();
    }

    fn receive(&self, bytes: &[u8]) {
        self.lib.wakeup(WakeupData::received(bytes)).unwrap();
    }

    /// Reply the trusted application gives to the next received message.
    fn tz_answers(&self, bytes: &[u8], timeout: u32) {
        self.tz
            .push(Reply::message(CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE, bytes, timeout));
    }

    fn last_to_sink(&self) -> (Vec<u8>, u32) {
        self.client
            .notifications()
            .into_iter()
            .rev()
            .find_map(|n| match n {
                ClientNotification::SendMessage {
                    message,
                    timeout_ms,
                } => Some((message.as_bytes().to_vec(), timeout_ms)),
                _ => None,
            })
            .unwrap()
    }
}

#[test]
fn start_loads_library_and_sends_ake_init() {
    let h = Harness::new(start_script(), config());
    h.wake(WakeupCommand::Start);

    assert_eq!(h.tz.commands(), vec![CommandId::LIB_INIT, CommandId::TXMTR_INIT]);
    assert_eq!(h.tz.app_name().as_deref(), Some("hdcp2p2"));
    assert_eq!(h.last_to_sink(), (msg(MessageId::AkeInit, 12), 200));

    let snap = h.lib.snapshot();
    assert!(snap.active);
    assert!(snap.flags.app_loaded && snap.flags.tx_initialized);
    assert_eq!(snap.context_handle, Some(CTX));
    assert_eq!(snap.phase, SessionPhase::TxInitialized);
    assert_eq!(snap.timeout_ms, 200);
    assert_eq!(snap.execution_mode, ExecutionMode::Tethered);
}

#[test]
fn receive_request_uses_client_timeout_or_falls_back() {
    let h = Harness::started(config());

    h.sent_with(0);
    assert_eq!(
        h.client.notifications(),
        vec![ClientNotification::ReceiveMessage { timeout_ms: 200 }]
    );
    assert_eq!(h.lib.snapshot().last_message_sent, Some(MessageId::AkeInit.raw()));

    h.client.clear();
    h.sent_with(75);
    assert_eq!(
        h.client.notifications(),
        vec![ClientNotification::ReceiveMessage { timeout_ms: 75 }]
    );
    assert!(h.tz.commands().is_empty());
}

#[test]
fn pairing_flow_waits_for_pairing_info_after_h_prime() {
    let h = Harness::started(config());
    h.sent_with(0);

    h.tz_answers(&msg(MessageId::AkeNoStoredKm, 129), 1000);
    h.receive(&msg(MessageId::AkeSendCert, 524));
    assert_eq!(h.tz.commands(), vec![CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE]);
    assert_eq!(h.last_to_sink(), (msg(MessageId::AkeNoStoredKm, 129), 1000));
    assert!(h.lib.snapshot().no_stored_km);
    assert_eq!(h.lib.snapshot().phase, SessionPhase::Authenticating);

    h.client.clear();
    h.sent_with(950);
    assert_eq!(
        h.client.notifications(),
        vec![ClientNotification::ReceiveMessage { timeout_ms: 950 }]
    );

    // H' produces nothing to send; the pairing info is still to come
    h.client.clear();
    h.tz_answers(&[], 200);
    h.receive(&msg(MessageId::AkeSendHPrime, 33));
    assert_eq!(
        h.client.notifications(),
        vec![ClientNotification::ReceiveMessage { timeout_ms: 200 }]
    );
    assert!(h.lib.snapshot().active);
}

#[test]
fn empty_reply_outside_pairing_fails_session() {
    let h = Harness::started(config());
    h.tz_answers(&[], 200);
    h.receive(&msg(MessageId::AkeSendHPrime, 33));

    assert_eq!(h.client.codes(), vec![NotificationCode::StatusFailed]);
    assert!(!h.lib.snapshot().active);
}

#[test]
fn eks_sent_enables_encryption() {
    let h = Harness::started(config());
    h.tz_answers(&ske_send_eks(), 0);
    h.receive(&msg(MessageId::LcSendLPrime, 33));
    h.client.clear();

    h.sent_with(0);
    assert_eq!(
        h.tz.commands(),
        vec![
            CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE,
            CommandId::TXMTR_SET_HW_KEY
        ]
    );
    assert_eq!(
        h.client.codes(),
        vec![NotificationCode::StatusSuccess, NotificationCode::LinkPoll]
    );
    let snap = h.lib.snapshot();
    assert!(snap.flags.authenticated);
    assert_eq!(snap.phase, SessionPhase::Authenticated);
    assert!(!snap.repeater);
}

#[test]
fn failed_hw_key_reports_exactly_one_failure() {
    let h = Harness::started(config());
    h.tz_answers(&ske_send_eks(), 0);
    h.receive(&msg(MessageId::LcSendLPrime, 33));
    h.client.clear();
    h.tz.clear_sent();

    h.tz.push(Reply::ok(CommandId::TXMTR_SET_HW_KEY).status(0xffff_ffff));
    h.sent_with(0);

    assert_eq!(h.client.codes(), vec![NotificationCode::StatusFailed]);
    assert_eq!(
        h.tz.commands(),
        vec![
            CommandId::TXMTR_SET_HW_KEY,
            CommandId::TXMTR_DEINIT,
            CommandId::LIB_DEINIT
        ]
    );
    let snap = h.lib.snapshot();
    assert!(!snap.active);
    assert!(snap.flags.error);
    assert!(!snap.flags.app_loaded && !snap.flags.tx_initialized);
    assert_eq!(snap.context_handle, None);
    assert_eq!(snap.phase, SessionPhase::TornDown);

    h.wake(WakeupCommand::Stop);
    h.wake(WakeupCommand::MessageSendFailed);
    assert_eq!(h.client.count(NotificationCode::StatusFailed), 1);
}

#[test]
fn stop_releases_without_reporting_failure() {
    let h = Harness::started(config());
    h.wake(WakeupCommand::Stop);

    assert!(h.client.codes().is_empty());
    assert_eq!(h.tz.commands(), vec![CommandId::TXMTR_DEINIT, CommandId::LIB_DEINIT]);
    assert!(!h.tz.app_running());
    let snap = h.lib.snapshot();
    assert!(snap.flags.is_init());
    assert_eq!(snap.phase, SessionPhase::TornDown);

    h.wake(WakeupCommand::Stop);
    assert_eq!(h.tz.commands().len(), 2);
    assert!(h.client.codes().is_empty());
}

#[test]
fn events_are_ignored_while_inactive() {
    let h = Harness::new(ScriptedChannel::new(), config());
    h.sent_with(10);
    h.receive(&msg(MessageId::AkeSendCert, 524));
    h.wake(WakeupCommand::MessageReceiveTimeout);
    h.wake(WakeupCommand::QueryStreamType);

    assert!(h.tz.commands().is_empty());
    assert!(h.client.codes().is_empty());
    assert_eq!(h.tz.starts(), 0);
    assert!(!h.lib.snapshot().active);
}

#[test]
fn events_after_stop_reach_nothing() {
    let h = Harness::started(config());
    h.wake(WakeupCommand::Stop);
    h.tz.clear_sent();

    h.receive(&msg(MessageId::AkeSendCert, 524));
    h.wake(WakeupCommand::MessageReceiveTimeout);
    assert!(h.tz.commands().is_empty());
    assert!(h.client.codes().is_empty());
}

#[test]
fn timeout_resends_lc_init_unchanged() {
    let h = Harness::started(config());
    let lc_init = msg(MessageId::LcInit, 9);
    h.tz.push(Reply::message(
        CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE,
        &lc_init,
        20,
    ));

    h.wake(WakeupCommand::MessageReceiveTimeout);
    assert_eq!(h.tz.commands(), vec![CommandId::TXMTR_SEND_MESSAGE_TIMEOUT]);
    assert_eq!(h.last_to_sink(), (lc_init, 20));
    assert_eq!(h.lib.snapshot().timeout_ms, 20);
    assert!(h.lib.snapshot().active);
}

#[test]
fn timeout_without_resend_fails_session() {
    let h = Harness::started(config());
    h.tz.push(Reply::ok(CommandId::TXMTR_SEND_MESSAGE_TIMEOUT));

    h.wake(WakeupCommand::MessageReceiveTimeout);
    assert_eq!(h.client.codes(), vec![NotificationCode::StatusFailed]);
    assert!(!h.lib.snapshot().active);
}

#[test]
fn timeout_with_wrong_sized_lc_init_fails_session() {
    let h = Harness::started(config());
    h.tz.push(Reply::message(
        CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE,
        &msg(MessageId::LcInit, 8),
        20,
    ));

    h.wake(WakeupCommand::MessageReceiveTimeout);
    assert_eq!(h.client.codes(), vec![NotificationCode::StatusFailed]);
}

#[test]
fn repeater_runs_topology_and_stream_query() {
    let h = Harness::started(SessionConfig {
        topology_wait_ms: 2000,
        ..config()
    });

    h.tz.push(
        Reply::message(
            CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE,
            &ske_send_eks(),
            3000,
        )
        .substate(TxmtrSubstate::WaitingForReceiverIdList),
    );
    h.receive(&msg(MessageId::LcSendLPrime, 33));
    let snap = h.lib.snapshot();
    assert!(snap.repeater && snap.update_stream);

    h.client.clear();
    h.sent_with(0);
    assert_eq!(
        h.client.codes(),
        vec![NotificationCode::StatusSuccess, NotificationCode::LinkPoll]
    );

    let ack = msg(MessageId::RepeaterAuthSendAck, 17);
    h.tz_answers(&ack, 100);
    h.receive(&msg(MessageId::RepeaterAuthSendReceiverIdList, 22));
    assert_eq!(h.last_to_sink(), (ack, 100));

    let manage = msg(MessageId::RepeaterAuthStreamManage, 6);
    h.tz.push(Reply::message(CommandId::TXMTR_QUERY_STREAM_TYPE, &manage, 100));
    h.sent_with(0);
    assert_eq!(h.last_to_sink(), (manage, 100));
    let snap = h.lib.snapshot();
    assert!(snap.repeater);
    assert!(!snap.update_stream);

    h.client.clear();
    h.tz.push(Reply::ok(CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE));
    h.receive(&msg(MessageId::RepeaterAuthStreamReady, 33));
    assert_eq!(h.client.codes(), vec![NotificationCode::LinkPoll]);

    // the released topology wait must not fail the session later
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(h.client.count(NotificationCode::StatusFailed), 0);
    assert!(h.lib.snapshot().active);
}

#[test]
fn ack_without_stream_update_polls_link() {
    let h = Harness::started(config());
    h.tz_answers(&msg(MessageId::RepeaterAuthSendAck, 17), 0);
    h.receive(&msg(MessageId::RepeaterAuthSendReceiverIdList, 22));
    h.client.clear();

    h.sent_with(0);
    assert_eq!(h.client.codes(), vec![NotificationCode::LinkPoll]);
}

#[test]
fn missing_receiver_id_list_fails_session() {
    let h = Harness::started(SessionConfig {
        topology_wait_ms: 300,
        ..config()
    });
    h.tz.push(
        Reply::message(
            CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE,
            &ske_send_eks(),
            3000,
        )
        .substate(TxmtrSubstate::WaitingForReceiverIdList),
    );
    h.receive(&msg(MessageId::LcSendLPrime, 33));
    h.sent_with(0);

    assert!(h.client.wait_for_code(NotificationCode::StatusFailed, WAIT));
    assert_eq!(h.client.count(NotificationCode::StatusFailed), 1);
    let snap = h.lib.snapshot();
    assert!(!snap.active);
    assert!(snap.flags.error);
    assert!(!h.tz.app_running());
}

#[test]
fn query_stream_type_needs_repeater() {
    let h = Harness::started(config());
    h.wake(WakeupCommand::QueryStreamType);
    assert!(h.tz.commands().is_empty());
    assert!(h.client.codes().is_empty());
}

#[test]
fn bad_wakeup_data_is_rejected() {
    let h = Harness::started(config());

    assert!(matches!(
        h.lib.wakeup(WakeupCommand::MessageReceiveSuccess.into()),
        Err(SessionError::MissingMessage)
    ));
    assert!(matches!(
        h.lib.wakeup(WakeupData::received(&[])),
        Err(SessionError::Message(MessageError::Empty))
    ));
    assert!(matches!(
        h.lib.wakeup(WakeupData::received(&[3; 535])),
        Err(SessionError::Message(MessageError::TooLarge { len: 535, max: 534 }))
    ));
    assert!(h.tz.commands().is_empty());
    assert!(h.lib.snapshot().active);
}

#[test]
fn restart_releases_previous_attempt() {
    let h = Harness::started(config());
    h.tz.push(Reply::ok(CommandId::TXMTR_DEINIT));
    h.tz.push(Reply::ok(CommandId::LIB_DEINIT));
    h.tz.push(Reply::ok(CommandId::LIB_INIT));
    h.tz.push(
        Reply::message(CommandId::TXMTR_INIT, &msg(MessageId::AkeInit, 12), 200).ctx(CTX + 1),
    );

    h.wake(WakeupCommand::Start);
    assert_eq!(
        h.tz.commands(),
        vec![
            CommandId::TXMTR_DEINIT,
            CommandId::LIB_DEINIT,
            CommandId::LIB_INIT,
            CommandId::TXMTR_INIT
        ]
    );
    assert_eq!(h.client.codes(), vec![NotificationCode::SendMessage]);
    assert_eq!(h.lib.snapshot().context_handle, Some(CTX + 1));
}

#[test]
fn restart_clears_protocol_flags() {
    let h = Harness::started(config());
    h.tz.push(
        Reply::message(
            CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE,
            &ske_send_eks(),
            3000,
        )
        .substate(TxmtrSubstate::WaitingForReceiverIdList),
    );
    h.receive(&msg(MessageId::LcSendLPrime, 33));
    h.tz_answers(&msg(MessageId::AkeNoStoredKm, 129), 1000);
    h.receive(&msg(MessageId::AkeSendCert, 524));
    h.sent_with(0);
    let snap = h.lib.snapshot();
    assert!(snap.repeater && snap.update_stream && snap.no_stored_km);
    assert_eq!(snap.last_message_received, Some(MessageId::AkeSendCert.raw()));

    h.tz.push(Reply::ok(CommandId::TXMTR_DEINIT));
    h.tz.push(Reply::ok(CommandId::LIB_DEINIT));
    h.tz.push(Reply::ok(CommandId::LIB_INIT));
    h.tz.push(Reply::message(CommandId::TXMTR_INIT, &msg(MessageId::AkeInit, 12), 200).ctx(CTX));
    h.wake(WakeupCommand::Start);

    let snap = h.lib.snapshot();
    assert!(snap.active);
    assert!(!snap.repeater);
    assert!(!snap.update_stream);
    assert!(!snap.no_stored_km);
    assert_eq!(snap.last_message_sent, None);
    assert_eq!(snap.last_message_received, None);
    assert_eq!(snap.phase, SessionPhase::TxInitialized);
}

#[test]
fn tethered_start_waits_for_running_step() {
    let h = Harness::started(config());
    h.tz.push(
        Reply::message(
            CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE,
            &ske_send_eks(),
            3000,
        )
        .substate(TxmtrSubstate::WaitingForReceiverIdList)
        .delay(Duration::from_millis(300)),
    );
    h.tz.push(Reply::ok(CommandId::TXMTR_DEINIT));
    h.tz.push(Reply::ok(CommandId::LIB_DEINIT));
    h.tz.push(Reply::ok(CommandId::LIB_INIT));
    h.tz.push(
        Reply::message(CommandId::TXMTR_INIT, &msg(MessageId::AkeInit, 12), 200).ctx(CTX + 1),
    );

    let restarted = std::thread::scope(|s| {
        s.spawn(|| h.receive(&msg(MessageId::LcSendLPrime, 33)));
        std::thread::sleep(Duration::from_millis(50));
        h.lib.wakeup(WakeupCommand::Start.into())
    });
    assert!(restarted.is_ok());

    assert_eq!(
        h.tz.commands(),
        vec![
            CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE,
            CommandId::TXMTR_DEINIT,
            CommandId::LIB_DEINIT,
            CommandId::LIB_INIT,
            CommandId::TXMTR_INIT
        ]
    );
    let snap = h.lib.snapshot();
    assert!(snap.active);
    assert!(!snap.repeater && !snap.update_stream);
    assert_eq!(snap.context_handle, Some(CTX + 1));
    assert_eq!(h.client.count(NotificationCode::StatusFailed), 0);
    assert!(h.client.notifications().iter().any(|n| matches!(
        n,
        ClientNotification::SendMessage { message, .. } if message.is(MessageId::AkeInit)
    )));
}

#[test]
fn queued_receives_keep_their_own_bytes() {
    let h = Harness::new(
        start_script(),
        SessionConfig {
            execution_mode: ExecutionMode::Threaded,
            ..config()
        },
    );
    h.wake(WakeupCommand::Start);
    assert!(h.client.wait_for_code(NotificationCode::SendMessage, WAIT));
    h.client.clear();

    h.tz.push(
        Reply::message(
            CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE,
            &msg(MessageId::AkeNoStoredKm, 129),
            1000,
        )
        .delay(Duration::from_millis(100)),
    );
    h.tz_answers(&[], 200);
    h.receive(&msg(MessageId::AkeSendCert, 524));
    h.receive(&msg(MessageId::AkeSendHPrime, 33));
    assert!(h.client.wait_for(2, WAIT));

    let sent = h.tz.sent();
    let processed: Vec<u8> = sent
        .iter()
        .filter(|c| c.command == CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE)
        .map(|c| c.request[12])
        .collect();
    assert_eq!(
        processed,
        vec![MessageId::AkeSendCert.raw(), MessageId::AkeSendHPrime.raw()]
    );
    assert_eq!(
        h.client.notifications()[1],
        ClientNotification::ReceiveMessage { timeout_ms: 200 }
    );
    assert_eq!(
        h.lib.snapshot().last_message_received,
        Some(MessageId::AkeSendHPrime.raw())
    );
}

#[test]
fn app_start_failure_reports_failure() {
    let tz = ScriptedChannel::new();
    tz.fail_next_start(-12);
    let h = Harness::new(tz, config());

    h.wake(WakeupCommand::Start);
    assert_eq!(h.client.codes(), vec![NotificationCode::StatusFailed]);
    let snap = h.lib.snapshot();
    assert!(!snap.active);
    assert!(snap.flags.error);
    assert!(!snap.flags.app_loaded);
}

#[test]
fn rejected_lib_init_shuts_app_down() {
    let tz = ScriptedChannel::new().then(Reply::ok(CommandId::LIB_INIT).status(1));
    let h = Harness::new(tz, config());

    h.wake(WakeupCommand::Start);
    assert_eq!(h.client.codes(), vec![NotificationCode::StatusFailed]);
    assert!(!h.tz.app_running());
    assert_eq!(h.tz.commands(), vec![CommandId::LIB_INIT]);
}

#[test]
fn feature_probe_is_cached() {
    let h = Harness::new(ScriptedChannel::new(), config());

    assert!(h.lib.feature_supported());
    assert_eq!(h.tz.commands(), vec![CommandId::LIB_INIT, CommandId::LIB_DEINIT]);
    assert!(!h.tz.app_running());

    assert!(h.lib.feature_supported());
    assert_eq!(h.tz.starts(), 1);
}

#[test]
fn feature_probe_failure_is_not_cached() {
    let tz = ScriptedChannel::new();
    tz.fail_next_start(-2);
    let h = Harness::new(tz, config());

    assert!(!h.lib.feature_supported());
    assert!(h.lib.feature_supported());
    assert_eq!(h.tz.starts(), 1);
}

#[test]
fn feature_probe_leaves_running_session_alone() {
    let h = Harness::started(config());
    assert!(h.lib.feature_supported());
    assert!(h.tz.commands().is_empty());
    assert!(h.tz.app_running());
}

#[test]
fn topology_needs_context() {
    let h = Harness::new(ScriptedChannel::new(), config());
    assert!(matches!(h.lib.topology_info(), Err(SessionError::NotInitialized)));
    assert!(matches!(h.lib.update_srm(0, 16), Err(SessionError::NotInitialized)));
}

#[test]
fn topology_lists_receivers() {
    let h = Harness::started(config());
    h.tz.push(Reply::topology(&[([1, 2, 3, 4, 5], 1, 2), ([6, 7, 8, 9, 10], 0, 1)]));

    let topology = h.lib.topology_info().unwrap();
    assert_eq!(topology.len(), 2);
    assert_eq!(topology.receivers()[1].receiver_id, [6, 7, 8, 9, 10]);
    assert_eq!(topology.receivers()[0].hdcp_version, 2);
    assert_eq!(h.tz.commands(), vec![CommandId::TXMTR_GET_TOPOLOGY_INFO]);
}

#[test]
fn srm_failure_leaves_session_running() {
    let h = Harness::started(config());
    h.tz.push(Reply::ok(CommandId::TXMTR_UPDATE_SRM).status(5));

    assert!(matches!(
        h.lib.update_srm(0x100, 0x40),
        Err(SessionError::SecureChannel(SecureChannelError::Status { status: 5, .. }))
    ));
    assert!(h.lib.snapshot().active);
    assert!(h.client.codes().is_empty());

    h.lib.update_srm(0x100, 0x40).unwrap();
}

#[test]
fn exec_type_switches_for_later_wakeups() {
    let h = Harness::new(start_script(), config());
    assert_eq!(h.lib.execution_mode(), ExecutionMode::Tethered);

    h.lib.update_exec_type(ExecutionMode::Threaded);
    h.lib.update_exec_type(ExecutionMode::Threaded);
    assert_eq!(h.lib.snapshot().execution_mode, ExecutionMode::Threaded);

    h.wake(WakeupCommand::Start);
    assert!(h.client.wait_for_code(NotificationCode::SendMessage, WAIT));
}

#[test]
fn start_is_busy_while_work_is_queued() {
    let tz = ScriptedChannel::new()
        .then(Reply::ok(CommandId::LIB_INIT).delay(Duration::from_millis(300)))
        .then(Reply::message(CommandId::TXMTR_INIT, &msg(MessageId::AkeInit, 12), 200).ctx(CTX));
    let h = Harness::new(tz, SessionConfig::threaded());

    h.wake(WakeupCommand::Start);
    assert!(matches!(
        h.lib.wakeup(WakeupCommand::Start.into()),
        Err(SessionError::Busy)
    ));
    assert!(h.lib.worker_status().pending > 0);

    assert!(h.client.wait_for_code(NotificationCode::SendMessage, WAIT));
    assert_eq!(h.tz.starts(), 1);
}

#[test]
fn deregister_releases_quietly() {
    let h = Harness::started(config());
    let Harness { lib, tz, client } = h;
    lib.deregister();

    assert_eq!(tz.commands(), vec![CommandId::TXMTR_DEINIT, CommandId::LIB_DEINIT]);
    assert!(!tz.app_running());
    assert!(client.codes().is_empty());
}

#[test]
fn invalid_config_is_refused() {
    let client = RecordingClient::new();
    let bad = SessionConfig {
        hw_key_delay_ms: 10,
        ..SessionConfig::default()
    };
    assert!(matches!(
        HdcpLibrary::register(ScriptedChannel::new(), Arc::new(client), bad),
        Err(SessionError::Config(ConfigError::HwKeyDelayTooShort { ms: 10, .. }))
    ));
}
