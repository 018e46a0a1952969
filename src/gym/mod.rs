pub mod flappy_bird;

pub use flappy_bird::{FlappyBird, FlappyBirdConfig};
