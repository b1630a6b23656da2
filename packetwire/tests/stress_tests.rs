//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Stress tests for request/response traffic over real sockets.

use packetwire::transport::{SocketTransport, Transport, TransportError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

const CLIENTS: usize = 4;
const REQUESTS: i32 = 200;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn read_packet(transport: &impl Transport) -> Result<(i32, Vec<u8>), TransportError> {
    let sequence = transport.begin_read()?;
    let mut payload = vec![0u8; transport.remaining()? as usize];
    let mut filled = 0;
    while filled < payload.len() {
        filled += transport.read(&mut payload[filled..])?;
    }
    transport.end_read()?;
    Ok((sequence, payload))
}

fn write_packet(
    transport: &impl Transport,
    sequence: i32,
    payload: &[u8],
) -> Result<(), TransportError> {
    transport.begin_write(sequence)?;
    transport.write(payload)?;
    transport.end_write()
}

/// Sizes on both sides of the default socket compression threshold.
fn request_payload(sequence: i32) -> Vec<u8> {
    let len = (sequence as usize * 997) % 20_000;
    (0..len).map(|i| (i * 7 + sequence as usize) as u8).collect()
}

fn serve(transport: SocketTransport, served: Arc<AtomicUsize>) {
    transport.enable_compression().unwrap();
    loop {
        let (sequence, mut payload) = match read_packet(&transport) {
            Ok(packet) => packet,
            Err(error) => {
                assert!(error.should_close_transport(), "{}", error);
                break;
            }
        };
        payload.reverse();
        if write_packet(&transport, sequence, &payload).is_err() {
            break;
        }
        served.fetch_add(1, Ordering::SeqCst);
    }
    transport.close().unwrap();
}

#[test]
fn test_many_clients_request_response() {
    init_tracing();
    let listener = SocketTransport::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let served = Arc::new(AtomicUsize::new(0));

    let server = {
        let served = Arc::clone(&served);
        thread::spawn(move || {
            let handlers: Vec<_> = (0..CLIENTS)
                .map(|_| {
                    let (transport, _) = SocketTransport::accept(&listener).unwrap();
                    let served = Arc::clone(&served);
                    thread::spawn(move || serve(transport, served))
                })
                .collect();
            for handler in handlers {
                handler.join().unwrap();
            }
        })
    };

    let clients: Vec<_> = (0..CLIENTS)
        .map(|_| {
            thread::spawn(move || {
                let client = SocketTransport::connect(addr.to_string()).unwrap();
                client.enable_compression().unwrap();
                for sequence in 1..=REQUESTS {
                    let request = request_payload(sequence);
                    write_packet(&client, sequence, &request).unwrap();

                    let (reply_sequence, reply) = read_packet(&client).unwrap();
                    assert_eq!(reply_sequence, sequence);
                    assert!(reply.iter().eq(request.iter().rev()));
                }
                client.close().unwrap();
            })
        })
        .collect();

    for client in clients {
        client.join().unwrap();
    }
    server.join().unwrap();
    assert_eq!(served.load(Ordering::SeqCst), CLIENTS * REQUESTS as usize);
}

#[test]
fn test_pipelined_writes_then_reads() {
    init_tracing();
    let listener = SocketTransport::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let served = Arc::new(AtomicUsize::new(0));

    let server = {
        let served = Arc::clone(&served);
        thread::spawn(move || {
            let (transport, _) = SocketTransport::accept(&listener).unwrap();
            serve(transport, served);
        })
    };

    let client = Arc::new(SocketTransport::connect(addr.to_string()).unwrap());
    let reader = {
        let client = Arc::clone(&client);
        thread::spawn(move || {
            (1..=REQUESTS)
                .map(|_| read_packet(&*client).unwrap().0)
                .collect::<Vec<_>>()
        })
    };
    for sequence in 1..=REQUESTS {
        write_packet(&*client, sequence, &request_payload(sequence)).unwrap();
    }

    let sequences = reader.join().unwrap();
    assert_eq!(sequences, (1..=REQUESTS).collect::<Vec<_>>());
    client.close().unwrap();
    server.join().unwrap();
    assert_eq!(served.load(Ordering::SeqCst), REQUESTS as usize);
}
