use std::path::PathBuf;

use engine::{
    compile_def_database, compile_defs_str, AppPaths, InputAction, InputSnapshot, Pose, Scene,
    SceneCommand, SceneWorld, Vec3,
};
use tempfile::TempDir;

use super::ai::{ChaserState, CompanionState, StalkerState};
use super::capture::CaptureSettings;
use super::effects::EffectKind;
use super::interaction::{InteractableKind, InteractionOutcome};
use super::inventory::ItemKind;
use super::layout::{Layout, LayoutRole};
use super::sequencer::SequenceState;
use super::session::{GameSession, SessionConfig};

const DT: f32 = 1.0 / 60.0;

const TRIAL_DEFS: &str = r#"<Defs>
    <SequenceDef>
        <defName>Trial</defName>
        <startOnLoad>true</startOnLoad>
        <steps>
            <li>
                <stepId>talk</stepId>
                <action>Dialogue</action>
                <dialogue><li><text>Hello there</text></li></dialogue>
            </li>
            <li>
                <stepId>grab</stepId>
                <action>Pickup</action>
                <target>Crate</target>
            </li>
            <li>
                <stepId>poke</stepId>
                <action>Interaction</action>
                <target>Lever</target>
            </li>
        </steps>
        <activateOnComplete><li>Exit</li></activateOnComplete>
    </SequenceDef>
</Defs>"#;

fn load_session(layout: Layout, defs_xml: &str, config: SessionConfig) -> (GameSession, SceneWorld) {
    let defs = compile_defs_str("test.xml", defs_xml).expect("defs");
    let mut session = GameSession::new(defs, layout, config);
    let mut world = SceneWorld::default();
    session.load(&mut world);
    world.apply_pending();
    (session, world)
}

fn step(session: &mut GameSession, world: &mut SceneWorld, input: &InputSnapshot) -> SceneCommand {
    let command = session.update(DT, input, world);
    world.apply_pending();
    command
}

fn idle(session: &mut GameSession, world: &mut SceneWorld, ticks: usize) {
    for _ in 0..ticks {
        step(session, world, &InputSnapshot::empty());
    }
}

fn press(action: InputAction) -> InputSnapshot {
    InputSnapshot::empty().with_action_pressed(action)
}

fn hold(action: InputAction) -> InputSnapshot {
    InputSnapshot::empty().with_action_down(action, true)
}

fn trial_layout() -> Layout {
    Layout::new("Trial")
        .place("Player", Vec3::ZERO, LayoutRole::Player)
        .place_hidden("Crate", Vec3::new(0.0, 0.0, 1.0), LayoutRole::Prop)
        .place_hidden("Lever", Vec3::new(0.0, 0.0, 1.5), LayoutRole::Prop)
        .place_hidden("Exit", Vec3::new(20.0, 0.0, 0.0), LayoutRole::Prop)
}

#[test]
fn three_step_sequence_runs_to_completion_through_the_session() {
    let config = SessionConfig {
        quit_after_sequence: Some("Trial".to_string()),
        ..SessionConfig::default()
    };
    let (mut session, mut world) = load_session(trial_layout(), TRIAL_DEFS, config);
    let crate_id = world.find_by_name("Crate").expect("crate");
    let exit_id = world.find_by_name("Exit").expect("exit");
    assert_eq!(
        session.sequence("Trial").expect("trial").state(),
        SequenceState::Running(0)
    );

    // "Hello there" reads in 2.6s, followed by the 1s gap.
    idle(&mut session, &mut world, 240);
    assert_eq!(
        session.sequence("Trial").expect("trial").state(),
        SequenceState::Running(1)
    );
    assert!(world.is_active(crate_id));

    assert_eq!(
        step(&mut session, &mut world, &press(InputAction::Interact)),
        SceneCommand::None
    );
    assert!(world.find_entity(crate_id).is_none());
    assert_eq!(
        session.sequence("Trial").expect("trial").state(),
        SequenceState::Running(2)
    );

    assert_eq!(
        step(&mut session, &mut world, &press(InputAction::Interact)),
        SceneCommand::Quit
    );
    let trial = session.sequence("Trial").expect("trial");
    assert_eq!(trial.state(), SequenceState::Complete);
    assert!(!trial.is_active());
    let ids: Vec<&str> = trial
        .transitions()
        .iter()
        .map(|transition| transition.step_id.as_str())
        .collect();
    assert_eq!(ids, vec!["talk", "grab", "poke"]);
    assert!(world.is_active(exit_id));

    let report = session.report();
    assert_eq!(report.signals.sequence_completed, 1);
    assert_eq!(report.signals.sequence_step_completed, 3);
    assert_eq!(report.signals.picked_up, 1);
}

#[test]
fn interacting_again_after_completion_changes_nothing() {
    let (mut session, mut world) = load_session(trial_layout(), TRIAL_DEFS, SessionConfig::default());
    idle(&mut session, &mut world, 240);
    step(&mut session, &mut world, &press(InputAction::Interact));
    step(&mut session, &mut world, &press(InputAction::Interact));
    assert_eq!(
        session.sequence("Trial").expect("trial").state(),
        SequenceState::Complete
    );

    step(&mut session, &mut world, &press(InputAction::Interact));
    step(&mut session, &mut world, &press(InputAction::Interact));

    let trial = session.sequence("Trial").expect("trial");
    assert_eq!(trial.transitions().len(), 3);
    assert_eq!(session.report().signals.sequence_completed, 1);
}

#[test]
fn chaser_capture_respawns_player_at_checkpoint() {
    let layout = Layout::new("Cellar")
        .place("Player", Vec3::new(0.0, 0.0, -10.0), LayoutRole::Player)
        .place(
            "Checkpoint",
            Vec3::new(0.0, 0.0, -10.0),
            LayoutRole::Checkpoint { radius: 1.0 },
        )
        .place(
            "Brute",
            Vec3::new(0.0, 0.0, 3.0),
            LayoutRole::Chaser {
                def: "Brute".to_string(),
            },
        );
    let config = SessionConfig {
        capture: CaptureSettings {
            fade_seconds: 0.1,
            black_hold_seconds: 0.1,
        },
        ..SessionConfig::default()
    };
    let (mut session, mut world) = load_session(
        layout,
        "<Defs><ChaserDef><defName>Brute</defName></ChaserDef></Defs>",
        config,
    );

    idle(&mut session, &mut world, 1);
    assert!(session.checkpoint().has_checkpoint());
    assert_eq!(session.report().chasers[0].state, ChaserState::Idle);

    session.place_player(&mut world, Pose::at(Vec3::ZERO));
    for _ in 0..120 {
        step(&mut session, &mut world, &InputSnapshot::empty());
        if session.capture().captures_completed() > 0 {
            break;
        }
    }

    assert_eq!(session.capture().captures_completed(), 1);
    assert_eq!(session.player_pose().position, Vec3::new(0.0, 0.0, -10.0));
    let player = world.find_by_name("Player").expect("player");
    assert_eq!(world.position_of(player), Some(Vec3::new(0.0, 0.0, -10.0)));
    let chaser = &session.report().chasers[0];
    assert_eq!(chaser.attack_triggers, 1);
    assert_eq!(chaser.state, ChaserState::Idle);
    let brute = world.find_by_name("Brute").expect("brute");
    assert_eq!(world.position_of(brute), Some(Vec3::new(0.0, 0.0, 3.0)));
}

#[test]
fn aimed_torch_drives_stalker_back() {
    let layout = Layout::new("Hall")
        .place("Player", Vec3::ZERO, LayoutRole::Player)
        .place(
            "Torch",
            Vec3::new(0.0, 0.0, 1.0),
            LayoutRole::Interactable(InteractableKind::WorldPickup(ItemKind::Torch)),
        )
        .place(
            "Shade",
            Vec3::new(0.0, 0.0, 6.0),
            LayoutRole::Stalker {
                def: "Shade".to_string(),
            },
        );
    let (mut session, mut world) = load_session(
        layout,
        "<Defs><StalkerDef><defName>Shade</defName></StalkerDef></Defs>",
        SessionConfig::default(),
    );

    step(&mut session, &mut world, &press(InputAction::Interact));
    assert_eq!(
        session.last_interaction(),
        Some(InteractionOutcome::Collected(ItemKind::Torch))
    );
    step(&mut session, &mut world, &press(InputAction::ToggleTorch));
    assert_eq!(session.equip().equipped_kind(), Some(ItemKind::Torch));
    assert_eq!(session.report().stalkers[0].state, StalkerState::Pursuing);

    step(&mut session, &mut world, &hold(InputAction::PrimaryUse));

    assert_eq!(session.report().stalkers[0].state, StalkerState::Retreating);
    assert!(session.equip().fuel() < 100.0);
}

#[test]
fn injectable_pickup_and_use_boosts_movement() {
    let layout = Layout::new("Lab")
        .place("Player", Vec3::ZERO, LayoutRole::Player)
        .place(
            "Vial",
            Vec3::new(0.0, 0.0, 1.0),
            LayoutRole::Interactable(InteractableKind::Injectable(EffectKind::SpeedBoost)),
        );
    let (mut session, mut world) = load_session(layout, "<Defs></Defs>", SessionConfig::default());
    let vial = world.find_by_name("Vial").expect("vial");

    step(&mut session, &mut world, &press(InputAction::Interact));
    assert!(!world.is_active(vial));
    step(&mut session, &mut world, &press(InputAction::ToggleInjection));
    assert_eq!(session.equip().equipped_kind(), Some(ItemKind::Injection));
    step(&mut session, &mut world, &press(InputAction::PrimaryUse));

    assert!(session.effects().is_active(EffectKind::SpeedBoost));
    assert!(world.find_entity(vial).is_none());

    step(&mut session, &mut world, &hold(InputAction::MoveForward));
    let expected = 5.0 * 2.0 * DT;
    assert!((session.player_pose().position.z - expected).abs() < 1e-5);
}

#[test]
fn pause_freezes_player_until_resumed() {
    let layout = Layout::new("Hall").place("Player", Vec3::ZERO, LayoutRole::Player);
    let (mut session, mut world) = load_session(layout, "<Defs></Defs>", SessionConfig::default());

    step(&mut session, &mut world, &press(InputAction::Pause));
    assert!(session.is_paused());
    for _ in 0..10 {
        step(&mut session, &mut world, &hold(InputAction::MoveForward));
    }
    assert_eq!(session.player_pose(), Pose::default());

    step(&mut session, &mut world, &press(InputAction::Pause));
    assert!(!session.is_paused());
    step(&mut session, &mut world, &hold(InputAction::MoveForward));
    assert!(session.player_pose().position.z > 0.0);
}

#[test]
fn end_trigger_starts_sequence_and_leaving_skips_it() {
    let layout = Layout::new("Manor")
        .place("Player", Vec3::ZERO, LayoutRole::Player)
        .place(
            "FinaleTrigger",
            Vec3::new(0.0, 0.0, 5.0),
            LayoutRole::EndTrigger {
                radius: 1.0,
                sequence: "Finale".to_string(),
            },
        );
    let defs = r#"<Defs><SequenceDef>
        <defName>Finale</defName>
        <steps>
            <li>
                <stepId>farewell</stepId>
                <action>Dialogue</action>
                <requiresInput>true</requiresInput>
                <dialogue><li><text>Goodbye</text></li></dialogue>
            </li>
        </steps>
    </SequenceDef></Defs>"#;
    let config = SessionConfig {
        quit_after_sequence: Some("Finale".to_string()),
        ..SessionConfig::default()
    };
    let (mut session, mut world) = load_session(layout, defs, config);
    assert_eq!(
        session.sequence("Finale").expect("finale").state(),
        SequenceState::NotStarted
    );

    session.place_player(&mut world, Pose::at(Vec3::new(0.0, 0.0, 5.0)));
    assert_eq!(
        step(&mut session, &mut world, &InputSnapshot::empty()),
        SceneCommand::None
    );
    assert_eq!(
        session.sequence("Finale").expect("finale").state(),
        SequenceState::Running(0)
    );

    session.place_player(&mut world, Pose::at(Vec3::ZERO));
    assert_eq!(
        step(&mut session, &mut world, &InputSnapshot::empty()),
        SceneCommand::Quit
    );
    let finale = session.sequence("Finale").expect("finale");
    assert_eq!(finale.state(), SequenceState::Complete);
    assert!(finale.transitions().is_empty());
}

#[test]
fn scene_exit_fades_and_places_player_at_named_spawn() {
    let layout = Layout::new("Manor")
        .place("Player", Vec3::ZERO, LayoutRole::Player)
        .place(
            "CellarExit",
            Vec3::new(0.0, 0.0, 5.0),
            LayoutRole::SceneExit {
                radius: 1.0,
                target: "Cellar".to_string(),
                spawn_point: "CellarSpawn".to_string(),
            },
        )
        .place("CellarSpawn", Vec3::new(10.0, -4.0, 0.0), LayoutRole::SpawnPoint);
    let (mut session, mut world) = load_session(layout, "<Defs></Defs>", SessionConfig::default());

    session.place_player(&mut world, Pose::at(Vec3::new(0.0, 0.0, 5.0)));
    idle(&mut session, &mut world, 30);
    assert_eq!(session.current_scene(), "Manor");

    // Fade-out lasts one second.
    idle(&mut session, &mut world, 40);
    assert_eq!(session.current_scene(), "Cellar");
    assert_eq!(session.player_pose().position, Vec3::new(10.0, -4.0, 0.0));
}

#[test]
fn play_once_dialogue_zone_removes_its_entity() {
    let layout = Layout::new("Hall")
        .place("Player", Vec3::ZERO, LayoutRole::Player)
        .place("Nook", Vec3::new(0.0, 0.0, 5.0), LayoutRole::Prop);
    let defs = r#"<Defs><DialogueZoneDef>
        <defName>NookWhisper</defName>
        <zone>Nook</zone>
        <radius>1</radius>
        <lines><li><text>Boo</text><playOnce>true</playOnce></li></lines>
    </DialogueZoneDef></Defs>"#;
    let (mut session, mut world) = load_session(layout, defs, SessionConfig::default());

    idle(&mut session, &mut world, 10);
    assert!(world.find_by_name("Nook").is_some());

    session.place_player(&mut world, Pose::at(Vec3::new(0.0, 0.0, 5.0)));
    // 2.3s on screen plus the 1s gap.
    idle(&mut session, &mut world, 240);

    assert!(world.find_by_name("Nook").is_none());
    let report = session.report();
    assert_eq!(report.dialogue_runs, 1);
    assert_eq!(report.signals.dialogue_complete, 1);
}

#[test]
fn unload_writes_report_file() {
    let temp = TempDir::new().expect("temp");
    let report_path = temp.path().join("session.json");
    let config = SessionConfig {
        report_path: Some(report_path.clone()),
        ..SessionConfig::default()
    };
    let (mut session, mut world) = load_session(trial_layout(), TRIAL_DEFS, config);
    idle(&mut session, &mut world, 5);

    session.unload(&mut world);

    let raw = std::fs::read_to_string(&report_path).expect("report");
    let json: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(json["scene"], "Trial");
    assert_eq!(json["ticks"], 5);
    assert_eq!(json["sequences"][0]["name"], "Trial");
    assert_eq!(world.entity_count(), 0);
}

#[test]
fn bundled_content_matches_demo_layout() {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..");
    let defs = compile_def_database(&AppPaths::from_root(root)).expect("bundled defs");
    let layout = Layout::demo();

    assert!(defs.sequence("Tutorial").is_some_and(|def| def.start_on_load));
    assert!(defs.sequence("Ending").is_some());
    for sequence in defs.sequences() {
        for step in &sequence.steps {
            if let Some(target) = &step.target {
                assert!(
                    layout.find(target).is_some(),
                    "step {} targets unknown entity {target}",
                    step.step_id
                );
            }
        }
        for name in sequence
            .activate_on_complete
            .iter()
            .chain(&sequence.deactivate_on_complete)
        {
            assert!(layout.find(name).is_some(), "unknown completion entity {name}");
        }
    }
    for zone in defs.dialogue_zones() {
        assert!(layout.find(&zone.zone).is_some(), "unknown zone {}", zone.zone);
    }
    for entry in &layout.entries {
        match &entry.role {
            LayoutRole::Chaser { def } => assert!(defs.chaser(def).is_some()),
            LayoutRole::Stalker { def } => assert!(defs.stalker(def).is_some()),
            LayoutRole::EndTrigger { sequence, .. } => assert!(defs.sequence(sequence).is_some()),
            _ => {}
        }
    }
}

#[test]
fn demo_session_loads_and_starts_tutorial() {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..");
    let defs = compile_def_database(&AppPaths::from_root(root)).expect("bundled defs");
    let mut session = GameSession::new(defs, Layout::demo(), SessionConfig::default());
    let mut world = SceneWorld::default();
    session.load(&mut world);
    world.apply_pending();

    assert_eq!(
        session.sequence("Tutorial").expect("tutorial").state(),
        SequenceState::Running(0)
    );
    assert_eq!(
        session.sequence("Ending").expect("ending").state(),
        SequenceState::NotStarted
    );
    let end_trigger = world.find_by_name("EndTrigger").expect("end trigger");
    assert!(!world.is_active(end_trigger));

    idle(&mut session, &mut world, 60);
    let report = session.report();
    assert_eq!(report.chasers[0].state, ChaserState::Idle);
    assert_eq!(report.stalkers.len(), 1);
    assert_eq!(report.companions[0].state, CompanionState::Following);
    assert!(session.debug_title(&world).is_some_and(|title| title.contains("Tutorial")));
}

#[test]
fn sprint_outpaces_walking_and_crouch_slows_it() {
    let layout = Layout::new("Track").place("Player", Vec3::ZERO, LayoutRole::Player);
    let (mut session, mut world) = load_session(layout, "<Defs></Defs>", SessionConfig::default());
    let forward = hold(InputAction::MoveForward);

    for _ in 0..60 {
        step(&mut session, &mut world, &forward.with_action_down(InputAction::Sprint, true));
    }
    assert!((session.player_pose().position.z - 7.0).abs() < 0.01);

    for _ in 0..60 {
        step(&mut session, &mut world, &forward.with_action_down(InputAction::Crouch, true));
    }
    assert!((session.player_pose().position.z - 10.0).abs() < 0.01);
}

#[test]
fn companion_follows_then_waits_when_left_behind() {
    let layout = Layout::new("Walk")
        .place("Player", Vec3::ZERO, LayoutRole::Player)
        .place("Buddy", Vec3::new(0.0, 0.0, -3.0), LayoutRole::Companion);
    let (mut session, mut world) = load_session(layout, "<Defs></Defs>", SessionConfig::default());
    let buddy = world.find_by_name("Buddy").expect("buddy");

    idle(&mut session, &mut world, 60);
    let gap = world.position_of(buddy).expect("pose").distance(Vec3::ZERO);
    assert!(gap < 2.5 && gap > 0.5, "gap {gap}");
    assert_eq!(session.report().companions[0].state, CompanionState::Following);

    session.place_player(&mut world, Pose::at(Vec3::new(0.0, 0.0, 20.0)));
    step(&mut session, &mut world, &InputSnapshot::empty());
    let parked = world.position_of(buddy).expect("pose");
    idle(&mut session, &mut world, 30);
    assert_eq!(world.position_of(buddy), Some(parked));
    assert_eq!(
        session.report().companions[0].state,
        CompanionState::WaitingForPlayer
    );

    session.place_player(&mut world, Pose::at(parked + Vec3::new(0.0, 0.0, 3.0)));
    idle(&mut session, &mut world, 5);
    assert_eq!(session.report().companions[0].state, CompanionState::Following);
    assert_ne!(world.position_of(buddy), Some(parked));
}

#[test]
fn companion_crouches_inside_low_ceiling_zone() {
    let layout = Layout::new("Crawl")
        .place("Player", Vec3::new(0.0, 0.0, 3.0), LayoutRole::Player)
        .place("Buddy", Vec3::ZERO, LayoutRole::Companion)
        .place("Vent", Vec3::ZERO, LayoutRole::LowCeiling { radius: 0.5 });
    let (mut session, mut world) = load_session(layout, "<Defs></Defs>", SessionConfig::default());

    step(&mut session, &mut world, &InputSnapshot::empty());
    let companion = &session.report().companions[0];
    assert_eq!(companion.state, CompanionState::Crouching);
    assert!(companion.crouching);

    idle(&mut session, &mut world, 60);
    assert_eq!(session.report().companions[0].state, CompanionState::Following);
}
