use cucumber::given;

use crate::cucumber::{loyalty_world::LoyaltySystem, LoyaltyWorld};

#[given("a fresh install")]
async fn fresh_install(world: &mut LoyaltyWorld) {
    let system = LoyaltySystem::new().await;
    world.system = Some(system);
}
