//! End-to-end quest flows driven through the engine.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use coven_core::event::BusEvent;
use coven_core::grid::{GridPosition, GridStateProvider};
use coven_dialogue::application::manager::DialogueAdvance;
use coven_quests::application::engine::QuestEngine;
use coven_quests::application::manager::QuestManager;
use coven_quests::domain::progress::QuestState;
use coven_test_support::{
    CameraCall, InMemoryGrid, MemoryProgressStore, RecordingCamera, RecordingEventBus,
    StaticContentSource, SteppingClock,
};
use serde_json::{Value, json};

struct Harness {
    engine: QuestEngine,
    bus: Arc<RecordingEventBus>,
    grid: Arc<InMemoryGrid>,
    camera: Arc<RecordingCamera>,
}

fn content_for(quests: &[Value]) -> StaticContentSource {
    quests.iter().fold(StaticContentSource::new(), |source, quest| {
        let id = quest["id"].as_str().unwrap();
        source.with(&format!("quests/{id}"), &quest.to_string())
    })
}

fn build(quests: &[Value], store: Arc<MemoryProgressStore>) -> Harness {
    let bus = Arc::new(RecordingEventBus::new());
    let grid = Arc::new(InMemoryGrid::new());
    let camera = Arc::new(RecordingCamera::new());
    let clock = Arc::new(SteppingClock::new(
        Utc.with_ymd_and_hms(2026, 4, 2, 16, 30, 0).unwrap(),
    ));
    let manager = QuestManager::new(clock, grid.clone(), camera.clone(), store);
    let engine = QuestEngine::new(manager, bus.clone(), Arc::new(content_for(quests)));
    Harness {
        engine,
        bus,
        grid,
        camera,
    }
}

async fn load_all(h: &mut Harness, quests: &[Value]) {
    let sources: Vec<String> = quests
        .iter()
        .map(|q| format!("quests/{}", q["id"].as_str().unwrap()))
        .collect();
    let loaded = h.engine.load_quests(&sources).await;
    assert_eq!(loaded.len(), quests.len());
}

async fn harness_with_store(quests: &[Value], store: Arc<MemoryProgressStore>) -> Harness {
    let mut h = build(quests, store);
    load_all(&mut h, quests).await;
    h
}

async fn harness(quests: &[Value]) -> Harness {
    harness_with_store(quests, Arc::new(MemoryProgressStore::new())).await
}

fn simple_quest(id: &str, prerequisites: &[&str]) -> Value {
    json!({
        "id": id,
        "title": format!("Quest {id}"),
        "prerequisites": prerequisites,
        "phases": [{"id": "only"}]
    })
}

fn objective(kind: &str) -> Value {
    json!({"description": format!("do {kind}"), "type": kind})
}

#[tokio::test]
async fn test_quest_unlocks_only_when_every_prerequisite_is_completed() {
    // Arrange
    let mut h = harness(&[
        simple_quest("a", &[]),
        simple_quest("b", &[]),
        simple_quest("c", &["a", "b"]),
    ])
    .await;
    h.bus.clear();

    // Act
    h.engine.start_quest("a").unwrap();

    // Assert
    assert_eq!(h.engine.manager().quest_state("a"), Some(QuestState::Completed));
    assert_eq!(h.engine.manager().quest_state("c"), Some(QuestState::Locked));
    assert!(h.engine.start_quest("c").is_err());

    h.engine.start_quest("b").unwrap();
    assert_eq!(h.engine.manager().quest_state("c"), Some(QuestState::Available));
    assert!(h.bus.events().contains(&BusEvent::QuestUnlocked {
        quest_id: "c".to_owned()
    }));
    assert_eq!(h.bus.count("quest-unlocked"), 1);
}

#[tokio::test]
async fn test_two_objectives_complete_phase_exactly_once_in_either_order() {
    let orders = [
        [BusEvent::TutorialPlayClicked, BusEvent::TutorialTerminalOpened],
        [BusEvent::TutorialTerminalOpened, BusEvent::TutorialPlayClicked],
    ];

    for [first, second] in orders {
        // Arrange
        let quest = json!({
            "id": "pair",
            "title": "Pair",
            "phases": [
                {"id": "both", "objectives": [objective("open_terminal"), objective("play_button")]},
                {"id": "after", "objectives": [objective("action_plant")]}
            ]
        });
        let mut h = harness(&[quest]).await;
        h.engine.start_quest("pair").unwrap();

        // Act
        h.engine.dispatch(first).await;

        // Assert
        assert_eq!(h.bus.count("quest-objective-completed"), 1);
        assert_eq!(h.bus.count("quest-phase-completed"), 0);

        h.engine.dispatch(second).await;
        assert_eq!(h.bus.count("quest-objective-completed"), 2);
        assert_eq!(h.bus.count("quest-phase-completed"), 1);
        assert_eq!(h.engine.manager().current_phase_index(), Some(1));

        h.engine.dispatch(BusEvent::TutorialPlayClicked).await;
        assert_eq!(h.bus.count("quest-phase-completed"), 1);
    }
}

#[tokio::test]
async fn test_movement_objective_through_the_bus() {
    let quest = json!({
        "id": "walk",
        "title": "Walk",
        "phases": [{"id": "move", "objectives": [
            {"description": "Move up and left", "type": "movement", "directions": ["up", "left"]}
        ]}]
    });
    let mut h = harness(&[quest]).await;
    h.engine.start_quest("walk").unwrap();

    h.engine
        .dispatch(BusEvent::TutorialMovement {
            direction: "ArrowUp".to_owned(),
        })
        .await;
    assert_eq!(h.engine.manager().quest_state("walk"), Some(QuestState::Active));

    h.engine
        .dispatch(BusEvent::TutorialMovement {
            direction: "a".to_owned(),
        })
        .await;
    assert_eq!(h.engine.manager().quest_state("walk"), Some(QuestState::Completed));
}

#[tokio::test]
async fn test_code_content_objective_waits_for_matching_code() {
    let quest = json!({
        "id": "code",
        "title": "Code",
        "phases": [{"id": "write", "objectives": [
            {"description": "Call move_forward()", "type": "code_content", "requiredCode": "move_forward()"}
        ]}]
    });
    let mut h = harness(&[quest]).await;
    h.engine.start_quest("code").unwrap();

    h.engine
        .dispatch(BusEvent::TutorialCodeChanged {
            content: "move".to_owned(),
        })
        .await;
    assert_eq!(h.bus.count("quest-objective-completed"), 0);

    h.engine
        .dispatch(BusEvent::TutorialCodeChanged {
            content: "drone.move_forward()".to_owned(),
        })
        .await;
    assert_eq!(h.bus.count("quest-objective-completed"), 1);
    assert_eq!(h.bus.count("quest-completed"), 1);
}

#[tokio::test]
async fn test_cancel_resets_progress_and_restart_counts_one_attempt() {
    // Arrange
    let phases: Vec<Value> = (0..4)
        .map(|i| json!({"id": format!("p{i}"), "objectives": [objective("play_button")]}))
        .collect();
    let quest = json!({"id": "long", "title": "Long", "phases": phases});
    let mut h = harness(&[quest]).await;
    h.engine.start_quest("long").unwrap();
    h.engine.complete_phase("long", 0).unwrap();
    h.engine.complete_phase("long", 1).unwrap();
    assert_eq!(h.engine.manager().current_phase_index(), Some(2));

    // Act
    h.engine.cancel_quest().unwrap();

    // Assert
    let progress = h.engine.manager().progress("long").unwrap();
    assert_eq!(progress.current_phase_index, 0);
    assert!(progress.phases.is_empty());
    assert_eq!(progress.state, QuestState::Available);
    assert_eq!(h.engine.manager().active_quest_id(), None);
    assert_eq!(h.bus.count("quest-cancelled"), 1);

    // Restart from an active quest bumps attempts once.
    h.engine.start_quest("long").unwrap();
    h.engine.complete_phase("long", 0).unwrap();
    let before = h.engine.manager().progress("long").unwrap().attempts;

    h.engine.restart_quest().unwrap();

    let after = h.engine.manager().progress("long").unwrap();
    assert_eq!(after.attempts, before + 1);
    assert_eq!(after.current_phase_index, 0);
    assert_eq!(h.engine.manager().current_phase_index(), Some(0));
}

#[tokio::test]
async fn test_empty_first_phase_completes_on_start_and_play_completes_quest() {
    // Arrange
    let quest = json!({
        "id": "e2e",
        "title": "End to end",
        "phases": [
            {"id": "intro"},
            {"id": "play", "objectives": [objective("play_button")]}
        ]
    });
    let mut h = harness(&[quest]).await;
    h.bus.clear();

    // Act
    h.engine.start_quest("e2e").unwrap();

    // Assert
    assert_eq!(
        h.bus.events().iter().filter(|e| matches!(
            e,
            BusEvent::QuestPhaseCompleted { phase_index: 0, .. }
        )).count(),
        1
    );
    assert_eq!(h.engine.manager().current_phase_index(), Some(1));

    h.engine.dispatch(BusEvent::TutorialPlayClicked).await;
    h.engine.dispatch(BusEvent::TutorialPlayClicked).await;

    assert_eq!(h.bus.count("quest-completed"), 1);
    assert_eq!(h.engine.manager().quest_state("e2e"), Some(QuestState::Completed));
    assert_eq!(h.engine.manager().active_quest_id(), None);
}

#[tokio::test]
async fn test_export_reset_import_round_trips_progress() {
    // Arrange
    let gated = json!({
        "id": "b",
        "title": "B",
        "prerequisites": ["a"],
        "phases": [{"id": "two", "objectives": [objective("open_terminal"), objective("play_button")]}]
    });
    let mut h = harness(&[simple_quest("a", &[]), gated]).await;
    h.engine.start_quest("a").unwrap();
    h.engine.start_quest("b").unwrap();
    h.engine.dispatch(BusEvent::TutorialPlayClicked).await;
    let before = h.engine.manager().state().snapshot();
    let blob = h.engine.export_progress().unwrap();

    // Act
    h.engine.reset_progress();
    assert!(h.engine.manager().progress("a").is_none());
    assert_eq!(h.engine.manager().quest_state("b"), Some(QuestState::Locked));
    h.engine.import_progress(&blob).unwrap();

    // Assert
    let after = h.engine.manager().state().snapshot();
    assert_eq!(after, before);
    assert_eq!(h.engine.manager().unlocked_quests(), before.unlocked_quests);
}

#[tokio::test]
async fn test_pre_dialogue_gate_hides_then_auto_advances_on_action() {
    // Arrange
    let quest = json!({
        "id": "talk",
        "title": "Talk",
        "phases": [
            {
                "id": "terminal",
                "preDialogue": [
                    {"speaker": "Mentor", "text": "Welcome, apprentice."},
                    {"speaker": "Mentor", "text": "Open the terminal."}
                ],
                "objectives": [objective("open_terminal")]
            },
            {"id": "next", "objectives": [objective("play_button")]}
        ]
    });
    let mut h = harness(&[quest]).await;
    h.engine.start_quest("talk").unwrap();
    assert!(h.engine.manager().dialogue().is_active());

    // Act
    assert_eq!(h.engine.advance_dialogue(), DialogueAdvance::Advanced(1));
    assert_eq!(
        h.engine.advance_dialogue(),
        DialogueAdvance::AwaitingRequirement
    );
    assert!(h.engine.manager().dialogue().should_hide());
    h.engine.dispatch(BusEvent::TutorialTerminalOpened).await;

    // Assert
    assert!(!h.engine.manager().dialogue().is_active());
    assert_eq!(h.bus.count("dialogue-closed"), 1);
    assert_eq!(h.bus.count("quest-phase-completed"), 1);
    assert_eq!(h.engine.manager().current_phase_index(), Some(1));
    assert!(h.camera.calls().contains(&CameraCall::LockToQubit));
}

#[tokio::test]
async fn test_zero_objective_phase_with_dialogue_completes_when_dialogue_closes() {
    let quest = json!({
        "id": "story",
        "title": "Story",
        "phases": [
            {"id": "tale", "preDialogue": [{"text": "Once upon a time"}]},
            {"id": "work", "objectives": [objective("action_harvest")]}
        ]
    });
    let mut h = harness(&[quest]).await;
    h.engine.start_quest("story").unwrap();
    assert_eq!(h.bus.count("quest-phase-completed"), 0);

    assert_eq!(h.engine.advance_dialogue(), DialogueAdvance::Closed);

    assert_eq!(h.bus.count("quest-phase-completed"), 1);
    assert_eq!(h.engine.manager().current_phase_index(), Some(1));
}

#[tokio::test]
async fn test_post_dialogue_defers_next_phase_until_closed() {
    // Arrange
    let quest = json!({
        "id": "post",
        "title": "Post",
        "phases": [
            {"id": "a", "objectives": [objective("play_button")], "postDialogue": [{"text": "Nicely done!"}]},
            {"id": "b", "objectives": [objective("action_plant")]}
        ]
    });
    let mut h = harness(&[quest]).await;
    h.engine.start_quest("post").unwrap();

    // Act
    h.engine.dispatch(BusEvent::TutorialPlayClicked).await;

    // Assert
    assert!(h.engine.manager().dialogue().is_active());
    assert_eq!(h.engine.manager().current_phase_index(), Some(0));
    assert_eq!(h.bus.count("quest-phase-started"), 1);

    assert_eq!(h.engine.advance_dialogue(), DialogueAdvance::Closed);
    assert_eq!(h.engine.manager().current_phase_index(), Some(1));
    assert_eq!(h.bus.count("quest-phase-started"), 2);
}

#[tokio::test]
async fn test_manual_phases_wait_for_advance_phase() {
    // Arrange
    let quest = json!({
        "id": "manual",
        "title": "Manual",
        "phases": [
            {"id": "read", "autoAdvance": false},
            {"id": "act", "autoAdvance": false, "objectives": [objective("play_button")]},
            {"id": "end", "objectives": [objective("action_plant")]}
        ]
    });
    let mut h = harness(&[quest]).await;

    // Act / Assert: a manual phase without objectives never completes alone.
    h.engine.start_quest("manual").unwrap();
    assert_eq!(h.bus.count("quest-phase-completed"), 0);
    h.engine.advance_phase().unwrap();
    assert_eq!(h.engine.manager().current_phase_index(), Some(1));

    // A manual phase with objectives completes but stays current.
    assert!(h.engine.advance_phase().is_err());
    h.engine.dispatch(BusEvent::TutorialPlayClicked).await;
    assert_eq!(h.bus.count("quest-phase-completed"), 2);
    assert_eq!(h.engine.manager().current_phase_index(), Some(1));

    h.engine.advance_phase().unwrap();
    assert_eq!(h.engine.manager().current_phase_index(), Some(2));
}

#[tokio::test]
async fn test_completion_grants_rewards_and_unlocks_reward_quest() {
    // Arrange
    let quest = json!({
        "id": "giver",
        "title": "Giver",
        "phases": [{"id": "only"}],
        "rewards": [
            {"type": "item", "itemId": "seed_bag", "amount": 2},
            {"type": "unlock_quest", "questId": "secret"}
        ]
    });
    let mut h = harness(&[quest, simple_quest("secret", &["never-loaded"])]).await;
    assert_eq!(h.engine.manager().quest_state("secret"), Some(QuestState::Locked));
    h.bus.clear();

    // Act
    h.engine.start_quest("giver").unwrap();

    // Assert
    let names = h.bus.names();
    let completed_at = names.iter().position(|n| *n == "quest-completed").unwrap();
    let granted_at = names.iter().position(|n| *n == "quest-reward-granted").unwrap();
    assert!(completed_at < granted_at);
    assert_eq!(h.bus.count("quest-reward-granted"), 2);
    assert!(h.bus.events().contains(&BusEvent::RewardItem {
        item_id: "seed_bag".to_owned(),
        amount: 2
    }));
    assert_eq!(h.engine.manager().quest_state("secret"), Some(QuestState::Available));
}

#[tokio::test]
async fn test_challenge_completion_reads_grid_and_grids_are_cleaned_up() {
    // Arrange
    let a = GridPosition::new(0, 0);
    let b = GridPosition::new(1, 0);
    let quest = json!({
        "id": "farm",
        "title": "Farm",
        "phases": [{
            "id": "grow",
            "challengeGrid": {"positions": [{"x": 0, "y": 0}, {"x": 1, "y": 0}]},
            "objectives": [{
                "description": "Grow wheat on both plots",
                "type": "challenge_completion",
                "positions": [{"x": 0, "y": 0}, {"x": 1, "y": 0}],
                "plantType": "wheat"
            }]
        }]
    });
    let mut h = harness(&[quest]).await;

    // Act
    h.engine.start_quest("farm").unwrap();

    // Assert
    assert_eq!(h.grid.challenge_grid_positions(), vec![a, b]);
    assert_eq!(h.bus.count("quest-challenge-grids"), 1);

    h.grid.plant_ready(a, "wheat");
    h.engine.dispatch(BusEvent::ActionHarvestClicked).await;
    assert_eq!(h.bus.count("quest-completed"), 0);

    h.grid.plant_ready(b, "wheat");
    h.engine.dispatch(BusEvent::ActionHarvestClicked).await;
    assert_eq!(h.bus.count("quest-completed"), 1);
    assert!(h.grid.challenge_grid_positions().is_empty());
}

#[tokio::test]
async fn test_closing_dialogue_restores_phase_challenge_grid() {
    let quest = json!({
        "id": "look",
        "title": "Look",
        "phases": [{
            "id": "g",
            "challengeGrid": {"positions": [{"x": 2, "y": 2}]},
            "preDialogue": [{"text": "Over here", "challengeGrid": {"positions": [{"x": 5, "y": 5}]}}],
            "objectives": [objective("play_button")]
        }]
    });
    let mut h = harness(&[quest]).await;
    h.engine.start_quest("look").unwrap();
    assert_eq!(
        h.grid.challenge_grid_positions(),
        vec![GridPosition::new(2, 2), GridPosition::new(5, 5)]
    );

    h.engine.close_dialogue();

    assert_eq!(h.grid.challenge_grid_positions(), vec![GridPosition::new(2, 2)]);
}

#[tokio::test]
async fn test_failed_dialogue_load_closes_pre_dialogue_and_phase_moves_on() {
    // Arrange
    let quest = json!({
        "id": "tour",
        "title": "Tour",
        "phases": [
            {
                "id": "welcome",
                "preDialogue": [{"text": "Over here", "challengeGrid": {"positions": [{"x": 5, "y": 5}]}}]
            },
            {"id": "play", "objectives": [objective("play_button")]}
        ]
    });
    let mut h = harness(&[quest]).await;
    h.engine.start_quest("tour").unwrap();
    assert!(h.engine.manager().dialogue().is_active());
    assert_eq!(h.grid.challenge_grid_positions(), vec![GridPosition::new(5, 5)]);
    h.bus.clear();

    // Act
    h.engine
        .dispatch(BusEvent::StartDialogue {
            source: "dialogue/missing".to_owned(),
        })
        .await;

    // Assert
    assert!(!h.engine.manager().dialogue().is_active());
    assert_eq!(h.bus.count("dialogue-closed"), 1);
    assert!(h.camera.calls().contains(&CameraCall::LockToQubit));
    assert!(h.grid.challenge_grid_positions().is_empty());
    assert_eq!(h.bus.count("quest-phase-completed"), 1);
    assert_eq!(h.engine.manager().current_phase_index(), Some(1));
}

#[tokio::test]
async fn test_restore_resumes_saved_phase_and_dialogue_cursor() {
    // Arrange
    let quest = json!({
        "id": "saga",
        "title": "Saga",
        "phases": [{
            "id": "chapter",
            "preDialogue": [{"text": "One"}, {"text": "Two"}, {"text": "Three"}],
            "objectives": [objective("play_button")]
        }]
    });
    let store = Arc::new(MemoryProgressStore::new());
    let mut first = harness_with_store(&[quest.clone()], store.clone()).await;
    first.engine.start_quest("saga").unwrap();
    first.engine.advance_dialogue();

    // Act: restore before loading content, as the host does at startup.
    let mut second = build(&[quest.clone()], store);
    assert!(second.engine.restore());
    load_all(&mut second, &[quest]).await;
    second.engine.resume_active_quest().unwrap();

    // Assert
    let manager = second.engine.manager();
    assert_eq!(manager.active_quest_id().as_deref(), Some("saga"));
    assert_eq!(manager.dialogue().current_index(), Some(1));
    assert_eq!(manager.progress("saga").unwrap().attempts, 1);
}

#[tokio::test]
async fn test_unknown_objective_kind_never_completes_but_quest_loads() {
    let quest = json!({
        "id": "odd",
        "title": "Odd",
        "phases": [{"id": "p", "objectives": [
            {"description": "Teleport", "type": "teleport"},
            objective("play_button")
        ]}]
    });
    let mut h = harness(&[quest]).await;
    h.engine.start_quest("odd").unwrap();

    h.engine.dispatch(BusEvent::TutorialPlayClicked).await;

    assert_eq!(h.bus.count("quest-objective-completed"), 1);
    assert_eq!(h.engine.manager().quest_state("odd"), Some(QuestState::Active));
}
