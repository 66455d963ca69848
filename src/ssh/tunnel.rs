use super::HostConfig;
use crate::error::{Error, Result};
use log::{debug, error, info};
use ssh2::{Channel, ErrorCode, Session, Stream};
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const LIBSSH2_ERROR_EAGAIN: i32 = -37;
const POLL_INTERVAL: Duration = Duration::from_millis(1);
const BUFFER_SIZE: usize = 16 * 1024;
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Local port forwarder through an ssh host.
///
/// Connections accepted on [Tunnel::local_addr] are forwarded to the remote
/// address, as resolved by the ssh host, over `direct-tcpip` channels. The
/// accept loop stops when the tunnel is dropped.
pub struct Tunnel {
    local_addr: SocketAddr,
    closed: Arc<AtomicBool>,
    accept_loop: Option<JoinHandle<()>>,
}

impl Tunnel {
    pub fn open(host: &HostConfig, remote_host: &str, remote_port: u16) -> Result<Self> {
        let session = connect(host)?;

        let local_error = |e: io::Error| Error::connection("local tunnel endpoint", e);
        let listener = TcpListener::bind(("127.0.0.1", 0)).map_err(local_error)?;
        let local_addr = listener.local_addr().map_err(local_error)?;

        info!(
            "Forwarding {} -> {}:{} via {}",
            local_addr, remote_host, remote_port, host.host_name
        );

        // Copy loops poll, so no call may hold the session lock while waiting.
        session.set_blocking(false);

        let closed = Arc::new(AtomicBool::new(false));
        let accept_loop = {
            let closed = closed.clone();
            let remote = (remote_host.to_string(), remote_port);
            thread::spawn(move || accept_loop(listener, session, remote, closed))
        };

        Ok(Self {
            local_addr,
            closed,
            accept_loop: Some(accept_loop),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for Tunnel {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);

        // Wake the accept loop so it sees the flag.
        let _ = TcpStream::connect(self.local_addr);
        if let Some(handle) = self.accept_loop.take() {
            let _ = handle.join();
        }
    }
}

fn connect(host: &HostConfig) -> Result<Session> {
    let target = format!("ssh://{}@{}:{}", host.user, host.host_name, host.port);
    let ssh_error = |e: ssh2::Error| Error::connection(&target, e);

    let tcp = TcpStream::connect((host.host_name.as_str(), host.port))
        .map_err(|e| Error::connection(&target, e))?;

    let mut session = Session::new().map_err(ssh_error)?;
    session.set_tcp_stream(tcp);
    session.handshake().map_err(ssh_error)?;

    // The host key is not verified.
    authenticate(&session, host).map_err(ssh_error)?;
    if !session.authenticated() {
        return Err(Error::connection(&target, "ssh authentication failed"));
    }

    debug!("ssh session established: {}", target);

    Ok(session)
}

/// Try the identity files in order, or the ssh-agent when there are none.
fn authenticate(session: &Session, host: &HostConfig) -> std::result::Result<(), ssh2::Error> {
    if host.identity_files.is_empty() {
        return session.userauth_agent(&host.user);
    }

    let mut result = Ok(());
    for identity in &host.identity_files {
        result = session.userauth_pubkey_file(&host.user, None, identity, None);
        match &result {
            Ok(()) => break,
            Err(e) => debug!("identity {:?} rejected: {}", identity, e),
        }
    }

    result
}

fn accept_loop(
    listener: TcpListener,
    session: Session,
    remote: (String, u16),
    closed: Arc<AtomicBool>,
) {
    let (remote_host, remote_port) = remote;

    for local in listener.incoming() {
        if closed.load(Ordering::SeqCst) {
            break;
        }

        let local = match local {
            Ok(local) => local,
            Err(e) => {
                error!("[{}:{}] {}", remote_host, remote_port, e);
                thread::sleep(accept_backoff(&e));
                continue;
            }
        };

        let descriptor = match local.peer_addr() {
            Ok(peer) => format!("{} -> {}:{}", peer, remote_host, remote_port),
            Err(_) => format!("? -> {}:{}", remote_host, remote_port),
        };

        match retry(|| session.channel_direct_tcpip(&remote_host, remote_port, None)) {
            Ok(channel) => {
                thread::spawn(move || forward(local, channel, descriptor));
            }
            Err(e) => error!("[{}] {}", descriptor, e),
        }
    }

    debug!("tunnel to {}:{} closed", remote_host, remote_port);
}

/// Pause before accepting again. Errors tied to one client clear at once,
/// others (e.g. out of file descriptors) need time to go away.
fn accept_backoff(e: &io::Error) -> Duration {
    match e.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => POLL_INTERVAL,
        _ => ACCEPT_BACKOFF,
    }
}

/// Copy both ways until one side is done, then close both.
fn forward(local: TcpStream, mut channel: Channel, descriptor: String) {
    debug!("[{}] started", descriptor);

    let local_writer = match local.try_clone() {
        Ok(writer) => writer,
        Err(e) => {
            error!("[{}] {}", descriptor, e);
            return;
        }
    };

    let done = Arc::new(AtomicBool::new(false));
    let incoming = {
        let remote = channel.stream(0);
        let done = done.clone();
        let descriptor = descriptor.clone();
        thread::spawn(move || {
            if let Err(e) = copy_from_remote(remote, &local_writer, &done) {
                error!("[{} / incoming] {}", descriptor, e);
            }
            done.store(true, Ordering::SeqCst);
            let _ = local_writer.shutdown(Shutdown::Both);
        })
    };

    if let Err(e) = copy_to_remote(&local, &mut channel) {
        error!("[{} / outgoing] {}", descriptor, e);
    }
    done.store(true, Ordering::SeqCst);

    let _ = retry(|| channel.send_eof());
    let _ = incoming.join();
    let _ = retry(|| channel.close());
    let _ = local.shutdown(Shutdown::Both);

    debug!("[{}] ended", descriptor);
}

fn copy_to_remote(mut local: &TcpStream, channel: &mut Channel) -> io::Result<()> {
    let mut buf = [0u8; BUFFER_SIZE];

    loop {
        let n = match local.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        write_all(channel, &buf[..n])?;
    }
}

fn copy_from_remote(mut remote: Stream, mut local: &TcpStream, done: &AtomicBool) -> io::Result<()> {
    let mut buf = [0u8; BUFFER_SIZE];

    loop {
        match remote.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => local.write_all(&buf[..n])?,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                if done.load(Ordering::SeqCst) {
                    return Ok(());
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

/// `write_all` for a non-blocking writer. Never flushes: flushing a channel
/// discards its pending incoming data.
fn write_all(writer: &mut impl Write, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        match writer.write(buf) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

fn would_block(e: &ssh2::Error) -> bool {
    matches!(e.code(), ErrorCode::Session(LIBSSH2_ERROR_EAGAIN))
}

/// Repeat a non-blocking ssh call until it stops asking to be retried.
fn retry<T>(mut op: impl FnMut() -> std::result::Result<T, ssh2::Error>) -> std::result::Result<T, ssh2::Error> {
    loop {
        match op() {
            Err(e) if would_block(&e) => thread::sleep(POLL_INTERVAL),
            other => return other,
        }
    }
}
