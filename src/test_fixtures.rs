#![cfg(test)]

//! Shared fixtures for unit tests: an in-memory file system, entry tree
//! builders, generated WAV payloads, and scripted probe/decoder doubles.

use std::collections::{HashMap, HashSet};
use std::f32::consts::TAU;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::audio::decode::Decoded;
use crate::audio::{Decoder, DurationProbe};
use crate::library::entry::{Entry, Node};
use crate::vfs::{mime_hint_for, ChildHandle, DirHandle, FileHandle, FileStat};

/// In-memory directory. Children are kept name-sorted so enumeration order
/// matches the disk implementation.
pub struct MemDir {
    name: String,
    children: Mutex<Vec<(String, ChildHandle)>>,
}

impl DirHandle for MemDir {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn list(&self) -> Result<Vec<(String, ChildHandle)>, String> {
        Ok(self.children.lock().unwrap().clone())
    }

    fn create_file(&self, name: &str, bytes: &[u8]) -> Result<(), String> {
        let mut children = self.children.lock().unwrap();
        children.retain(|(n, _)| n != name);
        children.push((
            name.to_string(),
            ChildHandle::File(Arc::new(MemFile {
                name: name.to_string(),
                bytes: bytes.to_vec(),
                last_modified: 0,
                fail_read: false,
            })),
        ));
        children.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(())
    }

    fn remove_child(&self, name: &str) -> Result<(), String> {
        let mut children = self.children.lock().unwrap();
        let before = children.len();
        children.retain(|(n, _)| n != name);
        if children.len() == before {
            return Err(format!("No such child: {}", name));
        }
        Ok(())
    }
}

struct MemFile {
    name: String,
    bytes: Vec<u8>,
    last_modified: i64,
    fail_read: bool,
}

impl FileHandle for MemFile {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn stat(&self) -> Result<FileStat, String> {
        Ok(FileStat {
            size: self.bytes.len() as u64,
            last_modified: self.last_modified,
            mime_hint: mime_hint_for(&self.name),
        })
    }

    fn read(&self) -> Result<Vec<u8>, String> {
        if self.fail_read {
            return Err(format!("Read failed for {}", self.name));
        }
        Ok(self.bytes.clone())
    }
}

/// A directory whose enumeration always fails.
pub struct FailingDir {
    name: String,
}

impl FailingDir {
    pub fn handle(name: &str) -> Arc<dyn DirHandle> {
        Arc::new(Self {
            name: name.to_string(),
        })
    }

    pub fn entry(name: &str) -> (String, ChildHandle) {
        (name.to_string(), ChildHandle::Dir(Self::handle(name)))
    }
}

impl DirHandle for FailingDir {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn list(&self) -> Result<Vec<(String, ChildHandle)>, String> {
        Err(format!("Enumeration failed for {}", self.name))
    }

    fn create_file(&self, _name: &str, _bytes: &[u8]) -> Result<(), String> {
        Err(format!("Write failed for {}", self.name))
    }

    fn remove_child(&self, _name: &str) -> Result<(), String> {
        Err(format!("Remove failed for {}", self.name))
    }
}

pub fn mem_dir(name: &str, mut children: Vec<(String, ChildHandle)>) -> Arc<dyn DirHandle> {
    children.sort_by(|a, b| a.0.cmp(&b.0));
    Arc::new(MemDir {
        name: name.to_string(),
        children: Mutex::new(children),
    })
}

pub fn mem_subdir(name: &str, children: Vec<(String, ChildHandle)>) -> (String, ChildHandle) {
    (name.to_string(), ChildHandle::Dir(mem_dir(name, children)))
}

/// A file whose size matters but whose contents do not.
pub fn mem_file(name: &str, size: u64, last_modified: i64) -> (String, ChildHandle) {
    mem_file_bytes(name, vec![0u8; size as usize], last_modified)
}

pub fn mem_file_bytes(name: &str, bytes: Vec<u8>, last_modified: i64) -> (String, ChildHandle) {
    (
        name.to_string(),
        ChildHandle::File(Arc::new(MemFile {
            name: name.to_string(),
            bytes,
            last_modified,
            fail_read: false,
        })),
    )
}

/// A file that stats fine but fails on read.
pub fn failing_read_file(name: &str) -> (String, ChildHandle) {
    (
        name.to_string(),
        ChildHandle::File(Arc::new(MemFile {
            name: name.to_string(),
            bytes: vec![0u8; 4],
            last_modified: 0,
            fail_read: true,
        })),
    )
}

/// Build a standalone file entry (no real backing directory).
pub fn file_entry(id: &str, name: &str, size: u64, last_modified: i64) -> Arc<Entry> {
    file_entry_full(id, name, size, last_modified, &mime_hint_for(name))
}

/// Like [`file_entry`] but with an explicit mime hint.
pub fn file_entry_mime(id: &str, name: &str, mime_hint: &str) -> Arc<Entry> {
    file_entry_full(id, name, 0, 0, mime_hint)
}

fn file_entry_full(
    id: &str,
    name: &str,
    size: u64,
    last_modified: i64,
    mime_hint: &str,
) -> Arc<Entry> {
    Arc::new(Entry {
        id: id.to_string(),
        name: name.to_string(),
        node: Node::File {
            size,
            last_modified,
            mime_hint: mime_hint.to_string(),
            handle: Arc::new(MemFile {
                name: name.to_string(),
                bytes: vec![0u8; size as usize],
                last_modified,
                fail_read: false,
            }),
            parent: mem_dir("parent", vec![]),
        },
    })
}

pub fn dir_entry(id: &str, name: &str, children: Vec<Arc<Entry>>) -> Arc<Entry> {
    Arc::new(Entry {
        id: id.to_string(),
        name: name.to_string(),
        node: Node::Directory {
            handle: mem_dir(name, vec![]),
            children,
        },
    })
}

/// Generate a silent 16-bit PCM mono WAV of the given length.
pub fn wav_bytes(seconds: f64, sample_rate: u32) -> Vec<u8> {
    wav_bytes_with_tone(seconds, sample_rate, 0.0)
}

/// Generate a 16-bit PCM mono WAV carrying a 440 Hz sine at `amplitude`.
pub fn wav_bytes_with_tone(seconds: f64, sample_rate: u32, amplitude: f32) -> Vec<u8> {
    let frames = (seconds * sample_rate as f64).round() as usize;
    let data_len = (frames * 2) as u32;
    let byte_rate = sample_rate * 2;

    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes()); // block align
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());

    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let sample = amplitude * (TAU * 440.0 * t).sin();
        out.extend_from_slice(&((sample * i16::MAX as f32) as i16).to_le_bytes());
    }
    out
}

/// Duration probe double: fixed duration for every file, with optional
/// per-name delay and failure scripting.
pub struct ScriptedProbe {
    duration: f64,
    delay: Option<Duration>,
    slow_names: HashSet<String>,
    failing_names: HashSet<String>,
}

impl ScriptedProbe {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            delay: None,
            slow_names: HashSet::new(),
            failing_names: HashSet::new(),
        }
    }

    /// Names that will block for `delay` before answering.
    pub fn slow(mut self, names: &[&str], delay: Duration) -> Self {
        self.delay = Some(delay);
        self.slow_names = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn failing(mut self, names: &[&str]) -> Self {
        self.failing_names = names.iter().map(|n| n.to_string()).collect();
        self
    }
}

impl DurationProbe for ScriptedProbe {
    fn probe(&self, _bytes: &[u8], name: &str) -> Result<f64, String> {
        if let Some(delay) = self.delay {
            if self.slow_names.contains(name) {
                std::thread::sleep(delay);
            }
        }
        if self.failing_names.contains(name) {
            return Err(format!("Probe failed for {}", name));
        }
        Ok(self.duration)
    }
}

/// Decoder double producing a fixed payload, with optional per-name delay
/// and failure scripting.
pub struct ScriptedDecoder {
    channel0: Vec<f32>,
    duration: f64,
    delay: Option<Duration>,
    slow_names: HashSet<String>,
    failing_names: HashSet<String>,
    payloads: HashMap<String, Vec<f32>>,
}

impl ScriptedDecoder {
    pub fn new(channel0: Vec<f32>, duration: f64) -> Self {
        Self {
            channel0,
            duration,
            delay: None,
            slow_names: HashSet::new(),
            failing_names: HashSet::new(),
            payloads: HashMap::new(),
        }
    }

    /// Per-name payload override, so tests can tell decodes apart.
    pub fn payload_for(mut self, name: &str, channel0: Vec<f32>) -> Self {
        self.payloads.insert(name.to_string(), channel0);
        self
    }

    pub fn slow(mut self, names: &[&str], delay: Duration) -> Self {
        self.delay = Some(delay);
        self.slow_names = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn failing(mut self, names: &[&str]) -> Self {
        self.failing_names = names.iter().map(|n| n.to_string()).collect();
        self
    }
}

impl Decoder for ScriptedDecoder {
    fn decode(&self, _bytes: &[u8], name: &str) -> Result<Decoded, String> {
        if let Some(delay) = self.delay {
            if self.slow_names.contains(name) {
                std::thread::sleep(delay);
            }
        }
        if self.failing_names.contains(name) {
            return Err(format!("Decode failed for {}", name));
        }
        let channel0 = self
            .payloads
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.channel0.clone());
        Ok(Decoded { channel0, duration: self.duration })
    }
}
