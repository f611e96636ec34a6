//! Parallel SHA-1 piece hashing.
//!
//! A single producer reads the input files sequentially, viewing them as one
//! logical byte stream, and cuts that stream into pieces of the configured
//! length. Every filled piece is handed to a pool of hashing workers; the
//! digests come back through one single-slot channel per piece, and those
//! channels are drained strictly in submission order. Completion order never
//! leaks into the output.
use std::fs::File;
use std::io::Read;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::{env, thread};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::debug;

use crate::bytes::{sha1, SHA1_DIGEST_LEN};
use crate::Error;

/// Environment variable overriding the number of hashing workers.
/// Must be a positive integer; anything else is ignored.
pub const HASHING_THREADS_ENV_VAR: &str = "TTORRENT_HASHING_THREADS";

struct HashTask {
    piece: Vec<u8>,
    digest: Sender<[u8; SHA1_DIGEST_LEN]>,
}

/// Hashes consecutive `piece_length`-sized windows over the logical
/// concatenation of the given files, in file order, using the default
/// worker count (host parallelism, unless [`HASHING_THREADS_ENV_VAR`]
/// overrides it).
///
/// Returns the concatenated 20-byte digests in piece order. The final piece
/// may be shorter than `piece_length`.
///
/// # Errors
///
/// Any I/O error while reading an input file aborts the pipeline; no partial
/// digest string is returned.
pub fn hash_pieces(files: &[PathBuf], piece_length: u64) -> Result<Vec<u8>, Error> {
    hash_pieces_with_workers(files, piece_length, worker_count())
}

/// Same as [`hash_pieces`] with an explicit worker count.
///
/// # Errors
///
/// Any I/O error while reading an input file aborts the pipeline.
///
/// # Panics
///
/// Panics if `piece_length` or `workers` is zero.
pub fn hash_pieces_with_workers(files: &[PathBuf], piece_length: u64, workers: usize) -> Result<Vec<u8>, Error> {
    assert!(piece_length > 0, "piece length must be positive");
    assert!(workers > 0, "worker count must be positive");

    let piece_length = usize::try_from(piece_length).expect("piece length should fit in memory");

    let (task_sender, task_receiver) = unbounded::<HashTask>();
    spawn_workers(workers, &task_receiver);

    debug!(workers, piece_length, "hashing {} file(s)", files.len());

    // One single-slot receiver per submitted piece, drained in submission
    // order after the producer finishes.
    let mut pending: Vec<Receiver<[u8; SHA1_DIGEST_LEN]>> = Vec::new();

    let mut buffer = vec![0u8; piece_length];
    let mut filled = 0;

    for path in files {
        let mut file = File::open(path)?;

        loop {
            let read = file.read(&mut buffer[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;

            if filled == piece_length {
                submit(&task_sender, &buffer[..filled], &mut pending);
                filled = 0;
            }
        }
    }

    // Residual partial piece at end of stream. A zero-length buffer is
    // never submitted.
    if filled > 0 {
        submit(&task_sender, &buffer[..filled], &mut pending);
    }

    // Closing the task channel lets the workers drain and exit.
    drop(task_sender);

    let mut pieces = Vec::with_capacity(pending.len() * SHA1_DIGEST_LEN);
    for receiver in pending {
        let digest = receiver
            .recv()
            .expect("a hashing worker should return a digest for every submitted piece");
        pieces.extend_from_slice(&digest);
    }

    Ok(pieces)
}

/// Number of pieces a stream of `total_size` bytes is cut into.
#[must_use]
pub fn piece_count(total_size: u64, piece_length: u64) -> u64 {
    total_size.div_ceil(piece_length)
}

fn spawn_workers(workers: usize, task_receiver: &Receiver<HashTask>) {
    for _ in 0..workers {
        let task_receiver = task_receiver.clone();

        thread::spawn(move || {
            // Workers are pure: hash whatever arrives until the producer
            // hangs up. A dropped digest receiver means the pipeline
            // already aborted, which is fine.
            for task in task_receiver {
                let _unused = task.digest.send(sha1(&task.piece));
            }
        });
    }
}

fn submit(task_sender: &Sender<HashTask>, piece: &[u8], pending: &mut Vec<Receiver<[u8; SHA1_DIGEST_LEN]>>) {
    let (digest_sender, digest_receiver) = bounded(1);

    task_sender
        .send(HashTask {
            piece: piece.to_vec(),
            digest: digest_sender,
        })
        .expect("the hashing workers should outlive the producer");

    pending.push(digest_receiver);
}

fn worker_count() -> usize {
    env::var(HASHING_THREADS_ENV_VAR)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|count| *count > 0)
        .unwrap_or_else(|| thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1))
}
