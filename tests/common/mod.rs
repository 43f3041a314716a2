#![allow(dead_code)]

use bytes::Bytes;
use websocket_receiver::{CloseCode, Error, Handler, Message, Utf8Bytes};

pub const FIN: u8 = 0x80;
pub const RSV1: u8 = 0x40;

pub const CONTINUE: u8 = 0x0;
pub const TEXT: u8 = 0x1;
pub const BINARY: u8 = 0x2;
pub const CLOSE: u8 = 0x8;
pub const PING: u8 = 0x9;
pub const PONG: u8 = 0xa;

/// Everything a receiver reported, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Message(Message),
    Close(CloseCode, String),
    Error(Error, CloseCode),
    Ping(Bytes),
    Pong(Bytes),
}

#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
}

impl Handler for Recorder {
    fn on_message(&mut self, message: Message) {
        self.events.push(Event::Message(message));
    }

    fn on_close(&mut self, code: CloseCode, reason: Utf8Bytes) {
        self.events.push(Event::Close(code, reason.to_string()));
    }

    fn on_error(&mut self, error: Error, code: CloseCode) {
        self.events.push(Event::Error(error, code));
    }

    fn on_ping(&mut self, payload: Bytes) {
        self.events.push(Event::Ping(payload));
    }

    fn on_pong(&mut self, payload: Bytes) {
        self.events.push(Event::Pong(payload));
    }
}

/// Encode a frame. `first` holds FIN, RSV and the opcode.
pub fn frame(first: u8, payload: &[u8], mask: Option<[u8; 4]>) -> Vec<u8> {
    let mut out = vec![first];
    let mask_bit = if mask.is_some() { 0x80 } else { 0x00 };
    match payload.len() {
        len @ 0..=125 => out.push(mask_bit | len as u8),
        len @ 126..=0xffff => {
            out.push(mask_bit | 126);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        }
        len => {
            out.push(mask_bit | 127);
            out.extend_from_slice(&(len as u64).to_be_bytes());
        }
    }
    match mask {
        Some(key) => {
            out.extend_from_slice(&key);
            out.extend(payload.iter().enumerate().map(|(i, byte)| byte ^ key[i % 4]));
        }
        None => out.extend_from_slice(payload),
    }
    out
}

pub fn text(s: &str) -> Event {
    Event::Message(Message::Text(s.into()))
}
