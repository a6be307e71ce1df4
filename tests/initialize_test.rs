use relaycard::sim::SimEvent;
use relaycard::sim::SimulatedChannel;
use relaycard::CardError;
use relaycard::RelayCard;

/// A chain that echoes `reply` as soon as the first setup byte arrives.
fn chain_replying(reply: Vec<u8>) -> SimulatedChannel {
    let sim = SimulatedChannel::new();
    let mut reply = Some(reply);
    sim.respond_with(move |_| reply.take().unwrap_or_default());
    sim
}

#[test]
fn test_detects_single_card() {
    let sim = chain_replying(vec![1, 2, 0, 0]);
    let card = RelayCard::new(sim.clone());

    assert_eq!(card.initialize().unwrap(), Some(1));
    assert_eq!(card.detected_card_count(), Some(1));
    assert!(card.is_initialized());

    // one setup byte is enough once the card answers, followed by 4 sync bytes
    assert_eq!(sim.written(), vec![1; 5]);
    assert_eq!(sim.events().first(), Some(&SimEvent::Open));
    assert_eq!(sim.events().last(), Some(&SimEvent::Close));
    assert!(!sim.is_open());
}

#[test]
fn test_skips_chunks_until_setup_echo() {
    let sim = chain_replying(vec![254, 9, 9, 9, 7, 7, 7, 7, 1, 4, 0, 0]);
    let card = RelayCard::new(sim);

    assert_eq!(card.initialize().unwrap(), Some(3));
    assert!(card.is_initialized());
}

#[test]
fn test_zero_address_means_255_cards() {
    let sim = chain_replying(vec![1, 0, 0, 0]);
    let card = RelayCard::new(sim);

    assert_eq!(card.initialize().unwrap(), Some(255));
    assert!(card.is_initialized());
}

#[test]
fn test_reported_address_one_is_no_card() {
    let sim = chain_replying(vec![1, 1, 0, 0]);
    let card = RelayCard::new(sim);

    assert_eq!(card.initialize().unwrap(), Some(0));
    assert!(!card.is_initialized());
}

#[test]
fn test_sends_all_setup_attempts_while_chain_is_silent() {
    let sim = SimulatedChannel::new();
    let mut writes = 0;
    sim.respond_with(move |_| {
        writes += 1;
        // answer the last sync byte only
        if writes == 8 {
            vec![1, 3, 0, 0]
        } else {
            Vec::new()
        }
    });
    let card = RelayCard::new(sim.clone());

    assert_eq!(card.initialize().unwrap(), Some(2));
    assert_eq!(sim.written(), vec![1; 8]);
}

#[test]
fn test_no_setup_echo_leaves_card_uninitialized() {
    let sim = chain_replying(vec![254; 4 * 256]);
    let card = RelayCard::new(sim.clone());

    assert_eq!(card.initialize().unwrap(), None);
    assert_eq!(card.detected_card_count(), None);
    assert!(!card.is_initialized());
    assert!(!sim.is_open());
}

#[test]
fn test_silent_chain_leaves_card_uninitialized() {
    let sim = SimulatedChannel::new();
    let card = RelayCard::new(sim.clone());

    assert_eq!(card.initialize().unwrap(), None);
    assert_eq!(card.detected_card_count(), None);
    assert!(!card.is_initialized());
    assert_eq!(sim.written(), vec![1; 8]);
    assert!(!sim.is_open());
}

#[test]
fn test_short_reply_without_echo_leaves_card_uninitialized() {
    let sim = chain_replying(vec![254, 9, 9, 9]);
    let card = RelayCard::new(sim.clone());

    assert_eq!(card.initialize().unwrap(), None);
    assert!(!card.is_initialized());
    assert!(!sim.is_open());
}

#[test]
fn test_failed_reinitialize_forgets_previous_chain() {
    let sim = chain_replying(vec![1, 2, 0, 0]);
    let card = RelayCard::new(sim.clone());
    assert_eq!(card.initialize().unwrap(), Some(1));
    assert!(card.is_initialized());

    sim.fail_open(true);

    assert!(matches!(card.initialize(), Err(CardError::Transport(_))));
    assert_eq!(card.detected_card_count(), None);
    assert!(!card.is_initialized());
}
