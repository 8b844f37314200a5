// End-to-end session scenarios driven through the public coordinator API.
#[cfg(test)]
mod tests {
    use crate::coordinator::{Dispatch, Phase, SessionEvent};
    use crate::messaging::{decode, topics, FinalScore, GameParams, InboundMessage};
    use crate::start::StartState;
    use crate::transport::{MemoryBus, Publisher, Transport};
    use crate::types::{DeviceGroupId, DeviceId, Millis, PlayerId};
    use crate::*;
    use std::sync::Arc;
    use tokio::sync::{mpsc, watch};

    const STORED: [char; 6] = ['S', 'T', 'O', 'R', 'E', 'D'];

    fn coordinator_with(config: SessionConfig) -> SessionCoordinator {
        SessionCoordinator::new(
            config,
            Box::new(FixedLetterPool::new(STORED)),
            Box::new(WordListJudge::from_words(["STORE", "REST", "DOTS"])),
        )
    }

    fn coordinator() -> SessionCoordinator {
        coordinator_with(SessionConfig::default())
    }

    fn link(c: &mut SessionCoordinator, from: u16, to: Option<u16>, now: Millis) -> Dispatch {
        c.dispatch(
            InboundMessage::NeighborReport {
                sender: DeviceId(from),
                neighbor: to.map(DeviceId),
            },
            now,
        )
        .expect("neighbor reports never fail")
    }

    /// Chains the first three cubes of a station and waits out the countdown.
    fn start_station(c: &mut SessionCoordinator, first: u16, now: Millis) -> Dispatch {
        link(c, first, Some(first + 1), now);
        link(c, first + 1, Some(first + 2), now);
        c.tick(now + 6_000)
    }

    fn final_score() -> FinalScore {
        FinalScore {
            score: 42,
            stars: 2,
            exit_code: 0,
            min_win_score: 10,
            duration_s: 95.5,
        }
    }

    #[test]
    fn test_chain_completion_starts_session_for_player_zero() {
        let mut c = coordinator();

        link(&mut c, 1, Some(2), 0);
        assert_eq!(c.detector(DeviceGroupId(0)).unwrap().state(), StartState::Chaining);

        let armed = link(&mut c, 2, Some(3), 100);
        assert!(armed.events.iter().any(|e| matches!(
            e,
            SessionEvent::CountdownArmed { deadline: 6_100, .. }
        )));

        // Countdown not over yet
        let early = c.tick(6_099);
        assert!(!c.phase().is_running());
        assert!(early.events.is_empty());

        let out = c.tick(6_100);
        assert_eq!(c.phase(), Phase::Running { started_at: 6_100 });
        assert_eq!(c.mapper().player_for(DeviceGroupId(0)), Some(PlayerId(0)));
        assert_eq!(c.racks().rack(PlayerId(0)).unwrap().letters(), "STORED");

        for (device, letter) in (1..=6).zip(["S", "T", "O", "R", "E", "D"]) {
            assert_eq!(out.last_payload(&format!("cube/{device}/letter")), Some(letter));
        }
        assert!(out.events.iter().any(|e| matches!(
            e,
            SessionEvent::SessionStarted { letters, .. } if letters == "STORED"
        )));

        // The chain still sitting there is judged right away
        assert_eq!(out.last_payload("cube/1/border"), Some("NSW:0xFFFF"));
        assert_eq!(out.last_payload("cube/3/border"), Some("ENS:0xFFFF"));
        assert_eq!(out.last_payload("cube/4/border"), Some(":"));
    }

    #[test]
    fn test_countdown_shows_progress_and_reverts_on_break() {
        let mut c = coordinator();
        link(&mut c, 1, Some(2), 0);
        link(&mut c, 2, Some(3), 0);

        // Cubes outside the chain go first
        let out = c.tick(4_000);
        let marked: Vec<&str> = out.messages.iter().map(|m| m.topic.as_str()).collect();
        assert_eq!(
            marked,
            ["cube/4/letter", "cube/5/letter", "cube/6/letter", "cube/1/letter"]
        );
        assert!(out.messages.iter().all(|m| m.payload == "?"));

        let broken = link(&mut c, 2, None, 4_500);
        assert!(broken
            .events
            .contains(&SessionEvent::CountdownCancelled { group: DeviceGroupId(0) }));
        assert_eq!(broken.on_topic("cube/1/letter").count(), 1);
        assert_eq!(broken.last_payload("cube/4/letter"), Some(" "));
        assert_eq!(c.detector(DeviceGroupId(0)).unwrap().state(), StartState::Chaining);

        // The old deadline is gone
        c.tick(6_000);
        assert!(!c.phase().is_running());

        // Re-forming needs a full countdown from the re-arm
        link(&mut c, 2, Some(3), 7_000);
        c.tick(12_999);
        assert!(!c.phase().is_running());
        c.tick(13_000);
        assert!(c.phase().is_running());
    }

    #[test]
    fn test_second_station_joins_late_without_touching_first_rack() {
        let mut c = coordinator();
        start_station(&mut c, 1, 0);

        c.dispatch(
            InboundMessage::LetterLanded {
                player: PlayerId(0),
                position: 5,
                letter: 'Y',
            },
            6_500,
        )
        .unwrap();

        link(&mut c, 11, Some(12), 7_000);
        link(&mut c, 12, Some(13), 7_000);
        let out = c.tick(13_000);

        assert_eq!(c.mapper().player_for(DeviceGroupId(1)), Some(PlayerId(1)));
        assert_eq!(c.racks().rack(PlayerId(0)).unwrap().letters(), "STOREY");
        assert_eq!(c.racks().rack(PlayerId(1)).unwrap().letters(), "STOREY");
        assert_eq!(out.last_payload("cube/16/letter"), Some("Y"));
        assert!(out.on_topic("cube/1/letter").next().is_none());
        assert!(out.events.iter().any(|e| matches!(
            e,
            SessionEvent::PlayerJoined { player: PlayerId(1), group: DeviceGroupId(1), .. }
        )));
    }

    #[test]
    fn test_letter_replacement_mirrors_by_slot_identity() {
        let mut c = coordinator();
        start_station(&mut c, 1, 0);
        start_station(&mut c, 11, 7_000);

        // Owner's cube first, then every other station
        let out = c
            .dispatch(
                InboundMessage::LetterLanded {
                    player: PlayerId(1),
                    position: 3,
                    letter: 'A',
                },
                14_000,
            )
            .unwrap();

        let topics: Vec<&str> = out
            .messages
            .iter()
            .filter(|m| m.topic.ends_with("/letter"))
            .map(|m| m.topic.as_str())
            .collect();
        assert_eq!(topics, ["cube/14/letter", "cube/4/letter"]);
        assert!(out.events.contains(&SessionEvent::LetterReplaced {
            owner: PlayerId(1),
            slot: types::SlotId::new(3).unwrap(),
            letter: 'A',
            players: vec![PlayerId(1), PlayerId(0)],
        }));
        assert_eq!(c.racks().rack(PlayerId(0)).unwrap().letters(), "STOAED");
    }

    #[test]
    fn test_bad_rack_reference_leaves_state_untouched() {
        let mut c = coordinator();
        start_station(&mut c, 1, 0);

        let err = c
            .dispatch(
                InboundMessage::LetterLanded {
                    player: PlayerId(7),
                    position: 0,
                    letter: 'Q',
                },
                7_000,
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidRackReference { player: PlayerId(7), .. }));

        let err = c
            .dispatch(
                InboundMessage::LetterLanded {
                    player: PlayerId(0),
                    position: 6,
                    letter: 'Q',
                },
                7_000,
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidRackReference { .. }));
        assert_eq!(c.racks().rack(PlayerId(0)).unwrap().letters(), "STORED");
    }

    #[test]
    fn test_cube_words_are_judged_and_bordered() {
        let mut c = coordinator();
        start_station(&mut c, 1, 0);

        link(&mut c, 3, Some(4), 7_000);
        let out = link(&mut c, 4, Some(5), 7_100);

        assert_eq!(out.last_payload("cube/1/border"), Some("NSW:0x07E0"));
        assert_eq!(out.last_payload("cube/3/border"), Some("NS:0x07E0"));
        assert_eq!(out.last_payload("cube/5/border"), Some("ENS:0x07E0"));
        assert_eq!(out.last_payload("cube/6/border"), Some(":"));
        assert_eq!(out.on_topic("cube/2/flash").count(), 1);
        assert!(out.events.iter().any(|e| matches!(
            e,
            SessionEvent::GuessJudged { word, judgement: Judgement::Good, .. } if word == "STORE"
        )));

        // Same word again is old
        link(&mut c, 4, None, 7_200);
        let again = link(&mut c, 4, Some(5), 7_300);
        assert_eq!(again.last_payload("cube/1/border"), Some("NSW:0xFFE0"));
        assert_eq!(again.on_topic("cube/1/flash").count(), 0);

        // A report that changes nothing redraws nothing
        assert!(link(&mut c, 4, Some(5), 7_400).is_empty());
    }

    #[test]
    fn test_keyboard_guess_moves_word_to_front() {
        let mut c = coordinator();
        c.dispatch(InboundMessage::ForceStart, 0).unwrap();
        assert!(c.phase().is_running());

        let out = c
            .dispatch(InboundMessage::Guess { word: "REST".into() }, 1_000)
            .unwrap();
        assert_eq!(c.racks().rack(PlayerId(0)).unwrap().letters(), "RESTOD");
        // Flashes follow slot identity, not position
        for device in [4, 5, 1, 2] {
            assert_eq!(out.on_topic(&format!("cube/{device}/flash")).count(), 1);
        }

        let unspellable = c
            .dispatch(InboundMessage::Guess { word: "ZOO".into() }, 1_100)
            .unwrap();
        assert!(unspellable.events.iter().any(|e| matches!(
            e,
            SessionEvent::GuessJudged { judgement: Judgement::Bad, slots, .. } if slots.is_empty()
        )));
        assert_eq!(c.racks().rack(PlayerId(0)).unwrap().letters(), "RESTOD");
    }

    #[test]
    fn test_guess_while_waiting_is_ignored() {
        let mut c = coordinator();
        let out = c
            .dispatch(InboundMessage::Guess { word: "REST".into() }, 0)
            .unwrap();
        assert!(out.is_empty());
        assert!(c.mapper().is_empty());
    }

    #[test]
    fn test_abort_resets_and_bumps_epoch() {
        let mut c = coordinator();
        start_station(&mut c, 1, 0);
        assert_eq!(c.epoch(), 0);

        let out = c.dispatch(InboundMessage::Abort, 7_000).unwrap();
        assert_eq!(c.epoch(), 1);
        assert_eq!(c.phase(), Phase::Waiting);
        assert!(c.racks().is_empty());
        assert!(c.mapper().is_empty());
        assert!(c.graph().neighbor_of(DeviceId(1)).is_none());
        assert_eq!(out.messages.len(), 12 * 3);
        assert!(out.messages.iter().all(|m| m.epoch == 1));
        assert!(out.events.contains(&SessionEvent::SessionReset { epoch: 1 }));

        // Start detection works again from scratch
        start_station(&mut c, 11, 8_000);
        assert_eq!(c.mapper().player_for(DeviceGroupId(1)), Some(PlayerId(0)));
    }

    #[test]
    fn test_game_finished_with_threshold_disables_start_until_next_game() {
        let mut c = coordinator();
        let params = GameParams {
            min_win_score: 10,
            ..GameParams::default()
        };
        c.dispatch(InboundMessage::GameStart { params: Some(params) }, 0)
            .unwrap();
        assert_eq!(c.params().min_win_score, 10);

        start_station(&mut c, 1, 100);
        let out = c
            .dispatch(InboundMessage::GameFinished(final_score()), 10_000)
            .unwrap();
        let score = out.on_topic(messaging::FINAL_SCORE_TOPIC).next().unwrap();
        assert!(score.retain);
        assert!(score.payload.contains("\"score\":42"));
        assert!(!c.start_enabled());
        assert_eq!(c.phase(), Phase::Waiting);
        assert_eq!(c.epoch(), 1);

        // Chains no longer arm
        link(&mut c, 1, None, 11_000);
        link(&mut c, 1, Some(2), 11_000);
        c.tick(20_000);
        assert!(!c.phase().is_running());

        // An empty game/start keeps the parameters and re-enables starting
        c.dispatch(InboundMessage::GameStart { params: None }, 21_000)
            .unwrap();
        assert!(c.start_enabled());
        assert_eq!(c.params().min_win_score, 10);
    }

    #[test]
    fn test_game_finished_without_threshold_keeps_start_enabled() {
        let mut c = coordinator();
        c.dispatch(InboundMessage::ForceStart, 0).unwrap();
        c.dispatch(InboundMessage::GameFinished(final_score()), 5_000)
            .unwrap();
        assert!(c.start_enabled());

        // Finishing twice does nothing the second time
        let again = c
            .dispatch(InboundMessage::GameFinished(final_score()), 5_100)
            .unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_designated_prompts_gate_arming() {
        let mut c = coordinator_with(SessionConfig {
            designated_prompts: true,
            ..SessionConfig::default()
        });

        link(&mut c, 1, None, 0);
        link(&mut c, 3, None, 0);
        let prompts = link(&mut c, 5, None, 0);
        assert_eq!(prompts.last_payload("cube/1/letter"), Some("A"));
        assert_eq!(prompts.last_payload("cube/3/letter"), Some("B"));
        assert_eq!(prompts.last_payload("cube/5/letter"), Some("C"));

        // Any other three-chain is ignored
        link(&mut c, 2, Some(4), 100);
        link(&mut c, 4, Some(6), 100);
        assert_eq!(c.detector(DeviceGroupId(0)).unwrap().deadline(), None);

        link(&mut c, 1, Some(3), 200);
        let armed = link(&mut c, 3, Some(5), 200);
        assert!(armed
            .events
            .iter()
            .any(|e| matches!(e, SessionEvent::CountdownArmed { .. })));
        c.tick(6_200);
        assert!(c.phase().is_running());
    }

    #[test]
    fn test_letter_lock_follows_position() {
        let mut c = coordinator();
        start_station(&mut c, 1, 0);

        let out = c
            .dispatch(
                InboundMessage::LetterLock {
                    player: PlayerId(0),
                    position: Some(2),
                },
                7_000,
            )
            .unwrap();
        assert_eq!(out.last_payload("cube/3/lock"), Some("1"));

        let moved = c
            .dispatch(
                InboundMessage::LetterLock {
                    player: PlayerId(0),
                    position: Some(4),
                },
                7_100,
            )
            .unwrap();
        assert_eq!(moved.last_payload("cube/3/lock"), Some(""));
        assert_eq!(moved.last_payload("cube/5/lock"), Some("1"));

        let cleared = c
            .dispatch(
                InboundMessage::LetterLock {
                    player: PlayerId(0),
                    position: None,
                },
                7_200,
            )
            .unwrap();
        assert_eq!(cleared.messages.len(), 1);
        assert_eq!(cleared.last_payload("cube/5/lock"), Some(""));
    }

    #[test]
    fn test_periodic_rebroadcast_is_not_retained() {
        let mut c = coordinator();
        start_station(&mut c, 1, 0);

        assert!(c.tick(13_999).is_empty());
        let out = c.tick(14_000);
        assert_eq!(out.messages.len(), 6);
        assert!(out.messages.iter().all(|m| !m.retain));
        assert_eq!(out.last_payload("cube/2/letter"), Some("T"));
    }

    #[test]
    fn test_boot_blanks_every_cube() {
        let mut c = coordinator();
        let out = c.boot(0);
        assert_eq!(out.messages.len(), 36);
        assert_eq!(out.last_payload("cube/16/letter"), Some(" "));
        assert_eq!(out.last_payload("cube/16/border"), Some(":"));
        assert_eq!(out.last_payload("cube/16/lock"), Some(""));
    }

    #[test]
    fn test_unknown_cubes_only_update_graph() {
        let mut c = coordinator();
        let out = link(&mut c, 99, Some(1), 0);
        assert!(out.is_empty());
        assert_eq!(c.graph().neighbor_of(DeviceId(99)), Some(DeviceId(1)));
    }

    #[tokio::test]
    async fn test_bus_round_trip_through_publisher() {
        let (bus, mut inbound) = MemoryBus::new();
        for filter in topics::SUBSCRIPTIONS {
            bus.subscribe(filter).await.unwrap();
        }
        let (epoch_tx, epoch_rx) = watch::channel(0);
        let publisher = Publisher::new(Arc::new(bus.clone()), epoch_rx);
        let (queue_tx, queue_rx) = mpsc::channel(64);
        let shutdown = ShutdownState::new();
        let publish_task = tokio::spawn(publisher.run(queue_rx, shutdown.clone()));

        let mut c = coordinator();
        bus.inject("cube/right/1", "2", true).await.unwrap();
        bus.inject("cube/right/2", "3", true).await.unwrap();
        bus.inject("app/start", "", false).await.unwrap();
        for _ in 0..3 {
            let message = inbound.recv().await.unwrap();
            let decoded = decode(&message.topic, &message.payload).unwrap();
            let out = c.dispatch(decoded, 0).unwrap();
            epoch_tx.send_replace(c.epoch());
            for m in out.messages {
                queue_tx.send(m).await.unwrap();
            }
        }
        drop(queue_tx);

        let stats = publish_task.await.unwrap();
        assert!(shutdown.is_shutdown_complete());
        assert!(stats.sent > 0);
        assert_eq!(bus.retained("cube/1/letter").await, Some(b"S".to_vec()));
    }

    #[test]
    fn test_second_station_keeps_its_countdown_when_first_starts() {
        let mut c = coordinator();

        link(&mut c, 1, Some(2), 0);
        link(&mut c, 2, Some(3), 0);
        link(&mut c, 11, Some(12), 1_000);
        link(&mut c, 12, Some(13), 1_000);
        let armed = StartState::Armed {
            armed_at: 1_000,
            deadline: 7_000,
        };
        assert_eq!(c.detector(DeviceGroupId(1)).unwrap().state(), armed);

        let first = c.tick(6_000);
        assert!(c.phase().is_running());
        assert_eq!(c.mapper().player_for(DeviceGroupId(0)), Some(PlayerId(0)));
        assert_eq!(c.detector(DeviceGroupId(1)).unwrap().state(), armed);
        // The armed station is not blanked
        assert_ne!(first.last_payload("cube/11/letter"), Some(" "));

        c.tick(6_999);
        assert_eq!(c.mapper().player_for(DeviceGroupId(1)), None);

        let joined = c.tick(7_000);
        assert_eq!(c.mapper().player_for(DeviceGroupId(1)), Some(PlayerId(1)));
        assert!(joined.events.iter().any(|e| matches!(
            e,
            SessionEvent::PlayerJoined {
                player: PlayerId(1),
                at: 7_000,
                ..
            }
        )));
        assert_eq!(
            c.racks().rack(PlayerId(1)).unwrap().letters(),
            c.racks().rack(PlayerId(0)).unwrap().letters()
        );
    }

    #[test]
    fn test_stations_completing_in_same_tick_both_join() {
        let mut c = coordinator();

        link(&mut c, 1, Some(2), 0);
        link(&mut c, 2, Some(3), 0);
        link(&mut c, 11, Some(12), 0);
        link(&mut c, 12, Some(13), 0);

        let out = c.tick(6_000);
        assert_eq!(c.phase(), Phase::Running { started_at: 6_000 });
        assert_eq!(c.mapper().player_for(DeviceGroupId(0)), Some(PlayerId(0)));
        assert_eq!(c.mapper().player_for(DeviceGroupId(1)), Some(PlayerId(1)));
        assert_eq!(out.last_payload("cube/1/letter"), Some("S"));
        assert_eq!(out.last_payload("cube/11/letter"), Some("S"));
    }
}
