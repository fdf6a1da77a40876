//! End-to-end session tests over in-process fakes.
//!
//! These exercise the full send/receive workflows: signing,
//! encryption, gated storage, pod notification, and the realtime
//! receive pipeline, with a real crypto capability and fake
//! network/pod collaborators.

use std::sync::Arc;

use dovecote_core::{Identity, StorageGate, connect::NoPortMapper};
use dovecote_crypto::KeyRing;
use dovecote_harness::{DeadNetwork, FakePod, FakePush, MemoryDht, MemoryNetwork, PodWorld};
use dovecote_proto::{ClearSignedMessage, InboxNotification, MessageKey, UserId};
use dovecote_session::{
    MessageSession, SessionConfig, SessionError, SessionEvent, SessionState, SystemEnv,
};

type Session = MessageSession<KeyRing, SystemEnv, FakePod<KeyRing>, MemoryDht>;

fn keyring(user_id: &str) -> Arc<KeyRing> {
    let user_id = UserId::parse(user_id).expect("valid user id");
    Arc::new(KeyRing::generate(user_id).expect("keygen"))
}

async fn connect(
    world: &PodWorld,
    network: &MemoryNetwork,
    ring: &Arc<KeyRing>,
    push: Option<FakePush>,
) -> (Session, dovecote_session::SessionEvents) {
    MessageSession::connect(
        Arc::clone(ring),
        SystemEnv::new(),
        FakePod::new(world.clone(), Arc::clone(ring)),
        network,
        &NoPortMapper,
        push,
        &SessionConfig::default(),
    )
    .await
    .expect("session connect")
}

#[tokio::test]
async fn send_produces_descriptor_and_decryptable_ciphertext() {
    let world = PodWorld::new("pod.example");
    let network = MemoryNetwork::new();

    let alice = keyring("alice@pod.example");
    let bob = keyring("bob@pod.example");

    let (alice_session, _alice_events) = connect(&world, &network, &alice, None).await;
    let (_bob_session, _bob_events) = connect(&world, &network, &bob, None).await;

    let recipient = UserId::parse("bob@pod.example").expect("valid user id");
    let descriptor = alice_session.send(&recipient, "hi bob").await.expect("send");

    assert_eq!(descriptor.recipient, recipient);
    assert_eq!(descriptor.key.as_str().len(), 40);
    assert!(descriptor.timestamp > 0);

    // The stored value passes the gate and decrypts, with the
    // SENDER's own key, to a signed message whose inner text is the
    // original.
    let gate = StorageGate::new(network.store().clone());
    let ciphertext = gate.get(&descriptor.key).await.expect("gated fetch");

    let signed = alice.decrypt(&ciphertext).expect("sender can re-decrypt");
    let inner = ClearSignedMessage::from_armored(&signed).expect("signed interior");
    assert_eq!(inner.text, "hi bob");

    // And the signature verifies against Alice's published key.
    let text = bob
        .verify(alice.public_key_armored(), &signed)
        .expect("signature verifies");
    assert_eq!(text, "hi bob");
}

#[tokio::test]
async fn recipient_resolves_queued_notification() {
    let world = PodWorld::new("pod.example");
    let network = MemoryNetwork::new();

    let alice = keyring("alice@pod.example");
    let bob = keyring("bob@pod.example");

    let (alice_session, _ae) = connect(&world, &network, &alice, None).await;
    let (bob_session, _be) = connect(&world, &network, &bob, None).await;

    let recipient = UserId::parse("bob@pod.example").expect("valid user id");
    alice_session.send(&recipient, "hi bob").await.expect("send");

    let queued = world.queued(&recipient);
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].from.alias(), "alice");

    let delivered = bob_session.resolve(queued[0].clone()).await.expect("resolve");
    assert_eq!(delivered.text, "hi bob");
    assert_eq!(delivered.notification.key, queued[0].key);
}

#[tokio::test]
async fn realtime_push_delivers_message_event() {
    let world = PodWorld::new("pod.example");
    let network = MemoryNetwork::new();

    let alice = keyring("alice@pod.example");
    let bob = keyring("bob@pod.example");
    let bob_id = UserId::parse("bob@pod.example").expect("valid user id");

    let (alice_session, _ae) = connect(&world, &network, &alice, None).await;

    let push = world.subscribe(&bob_id);
    let (bob_session, mut bob_events) = connect(&world, &network, &bob, Some(push)).await;

    assert!(matches!(bob_events.next().await, Some(SessionEvent::Ready)));

    alice_session.send(&bob_id, "realtime hello").await.expect("send");

    match bob_events.next().await {
        Some(SessionEvent::Message(delivered)) => {
            assert_eq!(delivered.text, "realtime hello");
            assert_eq!(delivered.notification.from.alias(), "alice");
        },
        other => panic!("expected message event, got {other:?}"),
    }

    assert_eq!(bob_session.state(), SessionState::Ready);
}

#[tokio::test]
async fn bad_notification_raises_error_event_but_session_survives() {
    let world = PodWorld::new("pod.example");
    let network = MemoryNetwork::new();

    let alice = keyring("alice@pod.example");
    let bob = keyring("bob@pod.example");
    let bob_id = UserId::parse("bob@pod.example").expect("valid user id");

    let (alice_session, _ae) = connect(&world, &network, &alice, None).await;

    let (tx, push) = dovecote_harness::push_pair();
    let (bob_session, mut bob_events) = connect(&world, &network, &bob, Some(push)).await;

    assert!(matches!(bob_events.next().await, Some(SessionEvent::Ready)));

    // A notification whose key names nothing in the DHT.
    let orphan = InboxNotification {
        key: MessageKey::parse(&"ab".repeat(20)).expect("valid key"),
        from: UserId::parse("alice@pod.example").expect("valid user id"),
        timestamp: 1,
    };
    tx.send(Ok(orphan)).expect("feed push");

    assert!(matches!(bob_events.next().await, Some(SessionEvent::Error(_))));
    assert_eq!(bob_session.state(), SessionState::Ready);

    // The session is still fully usable after the bad notification.
    alice_session.send(&bob_id, "still alive").await.expect("send after error");
    assert_eq!(world.queued(&bob_id).len(), 1);
}

#[tokio::test]
async fn join_failure_is_terminal_for_the_attempt() {
    let world = PodWorld::new("pod.example");
    let alice = keyring("alice@pod.example");

    let result = MessageSession::connect(
        Arc::clone(&alice),
        SystemEnv::new(),
        FakePod::new(world, Arc::clone(&alice)),
        &DeadNetwork,
        &NoPortMapper,
        None::<FakePush>,
        &SessionConfig::default(),
    )
    .await;

    assert!(matches!(result, Err(SessionError::Connect(_))));
}

#[tokio::test]
async fn duplicate_alias_fails_registration() {
    let world = PodWorld::new("pod.example");
    let network = MemoryNetwork::new();

    let alice = keyring("alice@pod.example");
    let (_session, _events) = connect(&world, &network, &alice, None).await;

    // A second identity claiming the same alias.
    let impostor = keyring("alice@pod.example");
    let result = MessageSession::connect(
        Arc::clone(&impostor),
        SystemEnv::new(),
        FakePod::new(world, Arc::clone(&impostor)),
        &network,
        &NoPortMapper,
        None::<FakePush>,
        &SessionConfig::default(),
    )
    .await;

    assert!(matches!(result, Err(SessionError::Client(_))));
}

#[tokio::test]
async fn failed_key_resolution_stores_nothing() {
    let world = PodWorld::new("pod.example");
    let network = MemoryNetwork::new();

    let alice = keyring("alice@pod.example");
    let (alice_session, _ae) = connect(&world, &network, &alice, None).await;

    let stranger = UserId::parse("stranger@pod.example").expect("valid user id");
    let result = alice_session.send(&stranger, "anyone there?").await;

    // Step 2 fails; steps 3-5 are never attempted.
    assert!(result.is_err());
    assert_eq!(network.store().put_count(), 0);
    assert!(world.queued(&stranger).is_empty());
}

#[tokio::test]
async fn multi_recipient_send_stores_once_and_notifies_each() {
    let world = PodWorld::new("pod.example");
    let network = MemoryNetwork::new();

    let alice = keyring("alice@pod.example");
    let bob = keyring("bob@pod.example");
    let carol = keyring("carol@pod.example");

    let (alice_session, _ae) = connect(&world, &network, &alice, None).await;
    let (bob_session, _be) = connect(&world, &network, &bob, None).await;
    let (carol_session, _ce) = connect(&world, &network, &carol, None).await;

    let bob_id = UserId::parse("bob@pod.example").expect("valid user id");
    let carol_id = UserId::parse("carol@pod.example").expect("valid user id");

    let descriptors = alice_session
        .send_to_many(&[bob_id.clone(), carol_id.clone()], "to both of you")
        .await
        .expect("broadcast send");

    // One ciphertext, one store, one key shared by both descriptors.
    assert_eq!(descriptors.len(), 2);
    assert_eq!(descriptors[0].key, descriptors[1].key);
    assert_eq!(network.store().put_count(), 1);

    // Each recipient got a notification and can read the message.
    for (session, user_id) in [(&bob_session, &bob_id), (&carol_session, &carol_id)] {
        let queued = world.queued(user_id);
        assert_eq!(queued.len(), 1);

        let delivered = session.resolve(queued[0].clone()).await.expect("resolve");
        assert_eq!(delivered.text, "to both of you");
    }
}

#[tokio::test]
async fn session_reaches_ready_after_connect() {
    let world = PodWorld::new("pod.example");
    let network = MemoryNetwork::new();

    let alice = keyring("alice@pod.example");
    let (session, mut events) = connect(&world, &network, &alice, None).await;

    assert_eq!(session.state(), SessionState::Ready);
    assert!(matches!(events.next().await, Some(SessionEvent::Ready)));
}
