#![no_main]
use libfuzzer_sys::fuzz_target;
use websocket_receiver::{
    extensions::{DeflateInflater, Extensions},
    Receiver, ReceiverConfig,
};

// The first byte picks the chunk size, the rest is the input stream.
fuzz_target!(|data: &[u8]| {
    let Some((&chunk_size, data)) = data.split_first() else {
        return;
    };
    let extensions = Extensions::new().with_permessage_deflate(DeflateInflater::default());
    let config = ReceiverConfig::default().max_payload(1 << 20);
    let mut receiver = Receiver::with_extensions((), config, extensions);
    for chunk in data.chunks(usize::from(chunk_size).max(1)) {
        receiver.add(chunk);
    }
});
