//! Client for the pigpio daemon (`pigpiod`) socket interface.
//!
//! Each command is a 16-byte little-endian request `(cmd, p1, p2, p3)`; the
//! daemon answers with 16 bytes whose first word echoes `cmd` and whose last
//! word is the signed result. Negative results are pigpio error codes.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{info, trace};

use crate::hardware::gpio::{GpioController, GpioError, GpioReadback, Level, Pin, PinMode};

/// Port pigpiod listens on unless started with `-p`.
pub const DEFAULT_PORT: u16 = 8888;

const FRAME_LEN: usize = 16;

/// Command numbers from the pigpio socket interface.
pub(crate) mod cmd {
    pub const MODES: u32 = 0;
    pub const MODEG: u32 = 1;
    pub const READ: u32 = 3;
    pub const WRITE: u32 = 4;
    pub const PWM: u32 = 5;
    pub const PRS: u32 = 6;
    pub const PFS: u32 = 7;
    pub const PRG: u32 = 22;
    pub const PFG: u32 = 23;
    pub const GDC: u32 = 83;
}

pub(crate) fn encode_request(cmd: u32, p1: u32, p2: u32) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[0..4].copy_from_slice(&cmd.to_le_bytes());
    frame[4..8].copy_from_slice(&p1.to_le_bytes());
    frame[8..12].copy_from_slice(&p2.to_le_bytes());
    // p3 is the length of an extension block; none of the commands used here has one.
    frame
}

pub(crate) fn decode_response(cmd: u32, frame: &[u8; FRAME_LEN]) -> Result<i32, GpioError> {
    let echoed = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
    if echoed != cmd {
        return Err(GpioError::Protocol(format!(
            "reply for command {echoed} while waiting for command {cmd}"
        )));
    }
    Ok(i32::from_le_bytes([frame[12], frame[13], frame[14], frame[15]]))
}

/// Blocking connection to one pigpio daemon.
///
/// The connection is process-scoped: open it once at startup, wrap it in a
/// [`SharedGpio`](crate::hardware::shared::SharedGpio), and let it drop at exit.
#[derive(Debug)]
pub struct PigpioClient {
    stream: TcpStream,
    peer: String,
}

impl PigpioClient {
    /// Connect to `host:port`, trying each resolved address in turn.
    ///
    /// `timeout` bounds the connect and every subsequent read and write.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, GpioError> {
        let mut last_err = None;
        for addr in (host, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    info!(%addr, "Connected to pigpio daemon");
                    return Ok(Self {
                        stream,
                        peer: addr.to_string(),
                    });
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err
            .unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::AddrNotAvailable, format!("{host} did not resolve"))
            })
            .into())
    }

    /// Address of the daemon this client is talking to.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    fn command(&mut self, op: &'static str, cmd: u32, pin: Pin, p2: u32) -> Result<u32, GpioError> {
        trace!(op, pin, p2, "pigpio request");
        self.stream.write_all(&encode_request(cmd, pin, p2))?;

        let mut reply = [0u8; FRAME_LEN];
        self.stream.read_exact(&mut reply)?;
        let result = decode_response(cmd, &reply)?;
        if result < 0 {
            return Err(GpioError::Rejected { op, pin, code: result });
        }
        Ok(result as u32)
    }
}

impl GpioController for PigpioClient {
    fn set_mode(&mut self, pin: Pin, mode: PinMode) -> Result<(), GpioError> {
        self.command("set_mode", cmd::MODES, pin, mode.code()).map(drop)
    }

    fn set_pwm_frequency(&mut self, pin: Pin, hz: u32) -> Result<(), GpioError> {
        // The daemon answers with the closest frequency it could set.
        let actual = self.command("set_PWM_frequency", cmd::PFS, pin, hz)?;
        if actual != hz {
            info!(pin, requested = hz, actual, "PWM frequency rounded by daemon");
        }
        Ok(())
    }

    fn set_pwm_range(&mut self, pin: Pin, range: u32) -> Result<(), GpioError> {
        self.command("set_PWM_range", cmd::PRS, pin, range).map(drop)
    }

    fn write(&mut self, pin: Pin, level: Level) -> Result<(), GpioError> {
        self.command("write", cmd::WRITE, pin, level.bit()).map(drop)
    }

    fn set_pwm_duty_cycle(&mut self, pin: Pin, duty: u32) -> Result<(), GpioError> {
        self.command("set_PWM_dutycycle", cmd::PWM, pin, duty).map(drop)
    }
}

impl GpioReadback for PigpioClient {
    fn mode(&mut self, pin: Pin) -> Result<PinMode, GpioError> {
        let code = self.command("get_mode", cmd::MODEG, pin, 0)?;
        PinMode::from_code(code)
            .ok_or_else(|| GpioError::Protocol(format!("pin {pin} is in alternate mode {code}")))
    }

    fn pwm_frequency(&mut self, pin: Pin) -> Result<u32, GpioError> {
        self.command("get_PWM_frequency", cmd::PFG, pin, 0)
    }

    fn pwm_range(&mut self, pin: Pin) -> Result<u32, GpioError> {
        self.command("get_PWM_range", cmd::PRG, pin, 0)
    }

    fn pwm_duty_cycle(&mut self, pin: Pin) -> Result<u32, GpioError> {
        self.command("get_PWM_dutycycle", cmd::GDC, pin, 0)
    }

    fn read(&mut self, pin: Pin) -> Result<Level, GpioError> {
        self.command("read", cmd::READ, pin, 0).map(Level::from_bit)
    }
}
