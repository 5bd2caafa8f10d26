//! # Events Module
//!
//! Progress reporting for the masking pipeline.
//!
//! ## Design
//! The core library emits events through channels so the CLI (or any other
//! front end) can drive progress bars without the workers knowing about it.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Chunk(ChunkEvent::ImageMasked { masked_pixels, .. }) = event {
//!             println!("masked {} pixels", masked_pixels);
//!         }
//!     }
//! });
//!
//! pipeline.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{EventChannel, EventReceiver, EventSender, null_sender};
pub use types::*;
