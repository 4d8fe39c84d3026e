//! carstore is a Rust library for reading and writing CAR (Content Addressable aRchive) v1 files,
//! which are used in the IPFS ecosystem to store collections of content-addressed blocks.
//!
//! An archive is a header (the list of root CIDs) followed by blocks, each one a CID and its
//! payload. The library exposes them as a small key/value store keyed by CID, with three ways
//! of reading an archive, depending on its size and how it is accessed:
//!
//! - [DecodedReader] decodes everything into memory,
//! - [StreamingReader] walks the blocks once, forward only,
//! - [IndexedReader] indexes a file and reads payloads on demand.
//!
//! Archives are produced with [CarWriter], which streams frames to any [std::io::Write] sink.
//!
//! The low-level "wire" format (varints, CIDs, header and frames) is available in [wire] for
//! callers who want to build their own tooling on top of it.
//!
//! ## Usages
//!
//! ### Read an entire CAR file and print the CIDs of its blocks
//! ```rust
//! use carstore::{CarRead, DecodedReader};
//!
//! let car_bytes = include_bytes!("res/carv1-basic.car");
//! let mut reader = DecodedReader::from_buffer(car_bytes).unwrap();
//! assert_eq!(reader.roots().unwrap().len(), 2);
//!
//! for entry in reader.entries(true).unwrap() {
//!     println!("Block raw/binary CID: {}", entry.unwrap().key);
//! }
//!
//! //>> Output:
//! // Block raw/binary CID: 01711220f88bc853804cf294fe417e4fa83028689fcdb1b1592c5102e1474dbc200fab8b
//! // Block raw/binary CID: 122002acecc5de2438ea4126a3010ecb1f8a599c8eff22fff1a1dcffe999b27fd3de
//! // Block raw/binary CID: 01551220b6fbd675f98e2abd22d4ed29fdc83150fedc48597e92dd1a7a24381d44a27451
//! // Block raw/binary CID: 122079a982de3c9907953d4d323cee1d0fb1ed8f45f8ef02870c0cb9e09246bd530a
//! // Block raw/binary CID: 0155122081cc5b17018674b401b42f35ba07bb79e211239c23bffe658da1577e3e646877
//! // Block raw/binary CID: 1220e7dc486e97e6ebe5cdabab3e392bdad128b6e09acc94bb4e2aa2af7b986d24d0
//! // Block raw/binary CID: 0155122061be55a8e2f6b4e172338bddf184d6dbee29c98853e0a0485ecee7f27b9af0b4
//! // Block raw/binary CID: 0171122069ea0740f9807a28f4d932c62e7c1c83be055e55072c90266ab3e79df63a365b
//! ```
//!
//! ### Look a block up by CID
//! ```rust
//! use carstore::{CarRead, DecodedReader, RawCid};
//!
//! let car_bytes = include_bytes!("res/carv1-basic.car");
//! let mut reader = DecodedReader::from_buffer(car_bytes).unwrap();
//!
//! let cid: RawCid = "0155122061be55a8e2f6b4e172338bddf184d6dbee29c98853e0a0485ecee7f27b9af0b4"
//!     .parse()
//!     .unwrap();
//! assert!(reader.has(&cid).unwrap());
//! assert_eq!(reader.get(&cid).unwrap(), b"aaaa");
//! ```
//!
//! ## Alternatives
//!
//! Alternatives to this library include:
//! - [rs-car](https://crates.io/crates/rs-car)
//! - [rust-car](https://crates.io/crates/rust-car)
//! - [blockless-car](https://crates.io/crates/blockless-car)

pub mod decode;
pub mod error;
pub mod index;
pub mod reader;
pub mod stream;
pub mod wire;
pub mod writer;

pub use decode::Decoded;
pub use error::{CarError, Result};
pub use index::CarIndex;
pub use reader::{CarRead, CarWrite, DecodedReader, Entries, Entry, IndexedReader, StreamingReader};
pub use stream::StreamDecoder;
pub use wire::{Block, BlockLocation, CarHeader, RawCid};
pub use writer::CarWriter;
