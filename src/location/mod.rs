/// Location support
///
/// - `geocoder.rs`: the platform geocoder and location-provider seams
/// - `resolver.rs`: coordinate → place name with the session cache

pub mod geocoder;
pub mod resolver;

pub use geocoder::{Address, Geocoder, LocationProvider, NoopGeocoder};
pub use resolver::{cache_key, in_bounds, LocationResolver};
