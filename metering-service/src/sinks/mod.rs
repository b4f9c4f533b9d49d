pub mod http_api;
pub mod mqtt;
pub mod sensors;

pub use mqtt::{MqttMessage, MqttPublisher};
pub use sensors::{SensorDefinition, SensorState, SensorType};
