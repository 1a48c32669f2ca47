use homestead::{
    agent::AgentState,
    building::{BuildingDef, Production, ResourceAmounts, ResourceRates},
    config::TownConfig,
    engine::{EngineBuilder, EngineSettings},
    grid::GridPos,
    scenario::ScenarioLoader,
    systems::{AgentSystem, DayCycleSystem, QuestSystem},
    world::World,
};

fn scenario_loader() -> ScenarioLoader {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
}

fn build_engine(name: &str, tick_seconds: f64) -> EngineBuilder {
    let settings = EngineSettings {
        scenario_name: name.into(),
        tick_seconds,
    };
    EngineBuilder::new(settings)
        .with_system(AgentSystem::new())
        .with_system(DayCycleSystem::new())
        .with_system(QuestSystem::new())
}

fn farm() -> BuildingDef {
    BuildingDef::named("Farm")
        .with_required_workers(1)
        .with_production(Production::Continuous {
            per_second: ResourceRates {
                food: 2.0,
                ..ResourceRates::default()
            },
        })
}

#[test]
fn hamlet_farm_fills_the_store_without_overflow() {
    let scenario = scenario_loader().load("scenarios/hamlet.yaml").unwrap();
    let mut world = scenario.build_world().unwrap();

    assert_eq!(world.registry().current_population(), 4);
    assert_eq!(world.registry().max_population(), 4);
    assert_eq!(world.workforce().active_count(), 1);
    let farm = world
        .registry()
        .iter()
        .find(|b| b.name() == "Farm")
        .map(|b| b.id)
        .unwrap();
    assert_eq!(world.building(farm).unwrap().assigned_workers, 1);
    assert_eq!(world.registry().idle_workers(), 3);

    let start_food = world.store().amounts().food;
    let cap = world.store().caps().food;
    let mut samples = Vec::new();
    let mut engine = build_engine(&scenario.name, scenario.tick_seconds).build();
    // 40 simulated seconds, short of the first meal at 60.
    engine
        .run_with_hook(&mut world, 400, |snapshot| samples.push(snapshot.resources.food))
        .unwrap();

    assert!(samples.iter().all(|food| *food <= cap));
    assert!(samples.windows(2).all(|pair| pair[1] >= pair[0]));
    let end_food = *samples.last().unwrap();
    assert!(end_food >= start_food + 5, "food only reached {end_food}");
}

#[test]
fn hungry_winter_cuts_efficiency_then_recovers() {
    let scenario = scenario_loader().load("scenarios/hungry_winter.yaml").unwrap();
    let mut world = scenario.build_world().unwrap();
    let mut engine = build_engine(&scenario.name, scenario.tick_seconds).build();

    engine.run(&mut world, 20).unwrap();
    let report = world.consumption().last_report().unwrap();
    assert_eq!(report.needed, 10);
    assert_eq!(report.consumed, 5);
    assert_eq!(report.deficit, 5);
    assert_eq!(report.hungry, 3);
    assert!((world.store().production_efficiency() - 0.4).abs() < 1e-9);
    assert!(world.consumption().hunger_warning());
    assert_eq!(world.clock().day(), 2);

    world.store_mut().add(ResourceAmounts::new(50, 0, 0));
    engine.run(&mut world, 20).unwrap();
    assert_eq!(world.store().production_efficiency(), 1.0);
    assert!(!world.consumption().hunger_warning());
    assert_eq!(world.store().amounts().food, 40);
    assert_eq!(world.clock().day(), 3);
}

#[test]
fn removing_the_only_dropoff_and_adding_another() {
    let mut config = TownConfig::default();
    config.population.initial = 1;
    let mut world = World::new(config, 0.1);

    let storage = BuildingDef::named("Storage").as_dropoff(0).into_shared();
    let old = world
        .spawn_building(storage.clone(), GridPos::new(8, 8))
        .unwrap();
    let field = world.spawn_building(farm().into_shared(), GridPos::new(2, 2)).unwrap();
    assert_eq!(world.registry().dropoff_for(field), Some(old));
    assert_eq!(world.workforce().active_count(), 1);

    world.remove_building(old).unwrap();
    assert_eq!(world.registry().dropoff_for(field), None);

    let food_before = world.store().amounts().food;
    for _ in 0..300 {
        world.advance_agents(0.1);
    }
    let agent = world.workforce().agents().next().unwrap();
    assert_eq!(agent.state(), AgentState::Working);
    assert!(agent.is_cargo_full(world.config().agents.carry_capacity));
    assert_eq!(world.store().amounts().food, food_before);

    let replacement = world.spawn_building(storage, GridPos::new(5, 2)).unwrap();
    assert_eq!(world.registry().dropoff_for(field), Some(replacement));
    for _ in 0..300 {
        world.advance_agents(0.1);
    }
    assert!(world.store().amounts().food > food_before);
}

#[test]
fn demolished_workplace_returns_agent_to_pool() {
    let scenario = scenario_loader().load("scenarios/hamlet.yaml").unwrap();
    let mut world = scenario.build_world().unwrap();
    let farm = world
        .registry()
        .iter()
        .find(|b| b.name() == "Farm")
        .map(|b| b.id)
        .unwrap();

    world.remove_building(farm).unwrap();
    assert_eq!(world.workforce().active_count(), 0);
    assert_eq!(world.registry().idle_workers(), 4);
    assert!(world.grid().is_valid_placement(GridPos::new(3, 4)));
}

#[test]
fn placing_a_lumber_camp_completes_the_first_quest() {
    let scenario = scenario_loader().load("scenarios/hamlet.yaml").unwrap();
    let catalog = scenario.catalog().unwrap();
    let mut world = scenario.build_world().unwrap();
    let mut engine = build_engine(&scenario.name, scenario.tick_seconds).build();

    let wood_before = world.store().amounts().wood;
    let food_before = world.store().amounts().food;
    let camp = world
        .place_building(catalog.get("Lumber Camp").unwrap(), GridPos::new(8, 4))
        .unwrap();
    assert_eq!(world.store().amounts().wood, wood_before - 5);
    assert_eq!(world.building(camp).unwrap().assigned_workers, 2);

    let log = world.quest_log().cloned().unwrap();
    assert_eq!(log.borrow().completed(), ["Raise a lumber camp".to_string()]);

    engine.run(&mut world, 1).unwrap();
    assert_eq!(world.store().amounts().food, food_before - 5 + 10);
    assert_eq!(log.borrow().status().unwrap().progress, 10);
}

#[test]
fn courier_from_demolished_farm_does_not_block_new_farm() {
    let mut config = TownConfig::default();
    config.population.initial = 1;
    let mut world = World::new(config, 0.1);
    let storage = BuildingDef::named("Storage").as_dropoff(0).into_shared();
    world.spawn_building(storage, GridPos::new(8, 8)).unwrap();
    let first = world.spawn_building(farm().into_shared(), GridPos::new(2, 2)).unwrap();

    for _ in 0..500 {
        let agent = world.workforce().agents().next().unwrap();
        if agent.state() == AgentState::Working && agent.cargo().food == 4 {
            break;
        }
        world.advance_agents(0.1);
    }

    world.remove_building(first).unwrap();
    let courier = world.workforce().agents().next().unwrap();
    assert_eq!(courier.state(), AgentState::MovingToStorage);
    assert_eq!(courier.work(), None);
    assert_eq!(courier.cargo().food, 4);
    assert_eq!(world.registry().idle_workers(), 1);

    let second = world.spawn_building(farm().into_shared(), GridPos::new(5, 2)).unwrap();
    assert_eq!(world.building(second).unwrap().assigned_workers, 1);
    assert_eq!(world.workforce().active_count(), 2);
    assert_eq!(world.registry().idle_workers(), 0);

    let food = world.store().amounts().food;
    for _ in 0..2000 {
        world.advance_agents(0.1);
    }
    assert_eq!(world.building(second).unwrap().assigned_workers, 1);
    assert_eq!(world.workforce().active_count(), 1);
    assert!(world.store().amounts().food >= food + 4);
}
