#![allow(dead_code)]

use mpp_bridge::prelude::*;
use mpp_bridge::transport::char_device::DeviceIo;
use mpp_bridge::transport::{
    CharDeviceOpen, Pacing, Primitives, SerialLink, SerialOpen, UsbLink, UsbOpen, UsbSettings,
};

use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;
use std::time::Duration;

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct Factory;
impl Factory {
    pub fn catalog() -> Catalog {
        Catalog::bundled()
    }

    /// Session config without any of the pacing sleeps.
    pub fn config(device: &str) -> SessionConfig {
        SessionConfig::new(device).with_pacing(Pacing::immediate())
    }

    pub fn command(text: &str) -> ResolvedCommand {
        Self::catalog().resolve(text).expect("command in bundled catalog")
    }

    pub fn descriptor_json(name: &str, regex: &str) -> String {
        serde_json::json!({
            "name": name,
            "description": format!("{} command", name),
            "type": "QUERY",
            "response": [["string", "Value", ""]],
            "test_responses": [],
            "regex": regex,
        })
        .to_string()
    }

    pub fn reply(body: &str) -> Vec<u8> {
        let mut r = body.as_bytes().to_vec();
        let sum = mpp::crc::checksum(&r);
        r.extend_from_slice(&sum);
        r.push(b'\r');
        r
    }
}

fn fail(kind: io::ErrorKind) -> io::Error {
    io::Error::new(kind, "fake failure")
}

// {{{ FakeSerial
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SerialEvent {
    Open(String, u32),
    Timeout(Duration),
    Clear,
    Write(Vec<u8>),
    Read,
}

#[derive(Clone, Default)]
pub struct FakeSerial {
    events: Arc<Mutex<Vec<SerialEvent>>>,
    replies: Arc<Mutex<VecDeque<io::Result<Vec<u8>>>>>,
    fail_open: bool,
    fail_write: bool,
}

impl FakeSerial {
    pub fn replying(replies: Vec<Vec<u8>>) -> Self {
        let fake = Self::default();
        for reply in replies {
            fake.push_reply(Ok(reply));
        }
        fake
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Default::default()
        }
    }

    pub fn failing_write() -> Self {
        Self {
            fail_write: true,
            ..Default::default()
        }
    }

    pub fn push_reply(&self, reply: io::Result<Vec<u8>>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn events(&self) -> Vec<SerialEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn timeouts(&self) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SerialEvent::Timeout(t) => Some(t.as_secs()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, event: &SerialEvent) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    pub fn boxed(&self) -> Box<dyn SerialOpen> {
        Box::new(self.clone())
    }

    fn record(&self, event: SerialEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl SerialOpen for FakeSerial {
    fn open(&self, port: &str, baud_rate: u32) -> io::Result<Box<dyn SerialLink>> {
        self.record(SerialEvent::Open(port.to_string(), baud_rate));
        if self.fail_open {
            return Err(fail(io::ErrorKind::NotFound));
        }
        Ok(Box::new(self.clone()))
    }
}

impl SerialLink for FakeSerial {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.record(SerialEvent::Timeout(timeout));
        Ok(())
    }

    fn clear_buffers(&mut self) -> io::Result<()> {
        self.record(SerialEvent::Clear);
        Ok(())
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.record(SerialEvent::Write(data.to_vec()));
        if self.fail_write {
            return Err(fail(io::ErrorKind::BrokenPipe));
        }
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        self.record(SerialEvent::Read);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}
// }}}

// {{{ FakeCharDevice
#[derive(Clone, Default)]
pub struct FakeCharDevice {
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    reads: Arc<Mutex<VecDeque<io::Result<Vec<u8>>>>>,
    read_calls: Arc<Mutex<usize>>,
    fail_open: bool,
    fail_write: bool,
}

impl FakeCharDevice {
    pub fn reading(reads: Vec<io::Result<Vec<u8>>>) -> Self {
        let fake = Self::default();
        fake.reads.lock().unwrap().extend(reads);
        fake
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Default::default()
        }
    }

    pub fn failing_write() -> Self {
        Self {
            fail_write: true,
            ..Default::default()
        }
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }

    pub fn read_calls(&self) -> usize {
        *self.read_calls.lock().unwrap()
    }

    pub fn boxed(&self) -> Box<dyn CharDeviceOpen> {
        Box::new(self.clone())
    }
}

impl CharDeviceOpen for FakeCharDevice {
    fn open(&self, _path: &str) -> io::Result<Box<dyn DeviceIo>> {
        if self.fail_open {
            return Err(fail(io::ErrorKind::PermissionDenied));
        }
        Ok(Box::new(self.clone()))
    }
}

impl io::Read for FakeCharDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        *self.read_calls.lock().unwrap() += 1;
        match self.reads.lock().unwrap().pop_front() {
            Some(Ok(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            Some(Err(e)) => Err(e),
            None => Err(fail(io::ErrorKind::WouldBlock)),
        }
    }
}

impl io::Write for FakeCharDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes.lock().unwrap().push(buf.to_vec());
        if self.fail_write {
            return Err(fail(io::ErrorKind::BrokenPipe));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
// }}}

// {{{ FakeUsb
#[derive(Clone, Default)]
pub struct FakeUsb {
    writes: Arc<Mutex<Vec<(u8, Vec<u8>)>>>,
    reads: Arc<Mutex<VecDeque<rusb::Result<Vec<u8>>>>>,
    read_calls: Arc<Mutex<usize>>,
    fail_open: bool,
}

impl FakeUsb {
    pub fn reading(reads: Vec<rusb::Result<Vec<u8>>>) -> Self {
        let fake = Self::default();
        fake.reads.lock().unwrap().extend(reads);
        fake
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Default::default()
        }
    }

    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn read_calls(&self) -> usize {
        *self.read_calls.lock().unwrap()
    }

    pub fn boxed(&self) -> Box<dyn UsbOpen> {
        Box::new(self.clone())
    }
}

impl UsbOpen for FakeUsb {
    fn open(&self, settings: &UsbSettings) -> Result<Box<dyn UsbLink>, TransportError> {
        if self.fail_open {
            return Err(TransportError::DeviceNotFound {
                vendor_id: settings.vendor_id,
                product_id: settings.product_id,
            });
        }
        Ok(Box::new(self.clone()))
    }
}

impl UsbLink for FakeUsb {
    fn write(&mut self, endpoint: u8, data: &[u8], _timeout: Duration) -> rusb::Result<usize> {
        self.writes.lock().unwrap().push((endpoint, data.to_vec()));
        Ok(data.len())
    }

    fn read(&mut self, _endpoint: u8, buf: &mut [u8], _timeout: Duration) -> rusb::Result<usize> {
        *self.read_calls.lock().unwrap() += 1;
        match self.reads.lock().unwrap().pop_front() {
            Some(Ok(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            Some(Err(e)) => Err(e),
            None => Err(rusb::Error::Timeout),
        }
    }
}
// }}}

pub fn serial_primitives(fake: &FakeSerial) -> Primitives {
    Primitives {
        serial: fake.boxed(),
        ..Default::default()
    }
}

pub fn char_device_primitives(fake: &FakeCharDevice) -> Primitives {
    Primitives {
        char_device: fake.boxed(),
        ..Default::default()
    }
}

pub fn usb_primitives(fake: &FakeUsb) -> Primitives {
    Primitives {
        usb: fake.boxed(),
        ..Default::default()
    }
}
