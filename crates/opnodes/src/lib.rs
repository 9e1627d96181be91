//! Standard operation library
//!
//! Collection of built-in operations for common workflow stages

mod constant;
mod debug;
mod math;
mod time;
mod transform;

pub use constant::Constant;
pub use debug::DebugLog;
pub use math::{Add, DivMod, Scale};
pub use time::Delay;
pub use transform::{JsonParse, JsonStringify};
use opruntime::OperationRegistry;

use std::sync::Arc;

/// Register all standard operations with a registry
pub fn register_all(registry: &mut OperationRegistry) {
    registry.register(Arc::new(constant::ConstantFactory));
    registry.register(Arc::new(debug::DebugFactory));
    registry.register(Arc::new(math::AddFactory));
    registry.register(Arc::new(math::ScaleFactory));
    registry.register(Arc::new(math::DivModFactory));
    registry.register(Arc::new(transform::JsonParseFactory));
    registry.register(Arc::new(transform::JsonStringifyFactory));
    registry.register(Arc::new(time::DelayFactory));
}
