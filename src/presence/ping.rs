use async_trait::async_trait;
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::TokioAsyncResolver;
use serde::Deserialize;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, instrument};

use super::{OnlinePlayer, OnlinePlayers, PresenceError};

pub const DEFAULT_MINECRAFT_PORT: u16 = 25565;

/// Protocol version sent in the handshake; servers answer status pings for any version
const PING_PROTOCOL_VERSION: i32 = -1;
const NEXT_STATE_STATUS: i32 = 1;
const STATUS_PACKET_ID: i32 = 0x00;
const MAX_FRAME_LEN: usize = 1 << 21;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Looks up the `_minecraft._tcp` SRV records of a host
#[async_trait]
pub trait SrvResolver: Send + Sync {
    /// Targets in preference order, empty when the host has no record
    async fn minecraft_srv(&self, host: &str) -> Result<Vec<ServerAddress>, PresenceError>;
}

/// [`SrvResolver`] over the system DNS configuration
pub struct DnsSrvResolver {
    resolver: TokioAsyncResolver,
}

impl DnsSrvResolver {
    pub fn from_system_conf() -> Result<Self, PresenceError> {
        let resolver = TokioAsyncResolver::tokio_from_system_conf()
            .map_err(|e| PresenceError::Source(format!("dns resolver: {e}")))?;
        Ok(Self { resolver })
    }
}

#[async_trait]
impl SrvResolver for DnsSrvResolver {
    async fn minecraft_srv(&self, host: &str) -> Result<Vec<ServerAddress>, PresenceError> {
        let name = format!("_minecraft._tcp.{}.", host.trim_end_matches('.'));
        let lookup = match self.resolver.srv_lookup(name.as_str()).await {
            Ok(lookup) => lookup,
            Err(e) if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
                return Ok(Vec::new())
            }
            Err(e) => return Err(PresenceError::Source(format!("srv lookup {name}: {e}"))),
        };

        let mut records: Vec<_> = lookup.iter().collect();
        records.sort_by_key(|srv| (srv.priority(), std::cmp::Reverse(srv.weight())));
        Ok(records
            .into_iter()
            .map(|srv| {
                let target = srv.target().to_utf8();
                ServerAddress::new(target.trim_end_matches('.'), srv.port())
            })
            .collect())
    }
}

/// Splits `host` or `host:port`
pub fn parse_server(server: &str) -> Result<(String, Option<u16>), PresenceError> {
    let server = server.trim();
    let invalid = || PresenceError::Source(format!("invalid server address '{server}'"));

    match server.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => {
            let port = port.parse().map_err(|_| invalid())?;
            Ok((host.to_string(), Some(port)))
        }
        Some(_) => Err(invalid()),
        None if server.is_empty() => Err(invalid()),
        None => Ok((server.to_string(), None)),
    }
}

/// Resolves a configured server the way the game client does: an explicit port
/// is used as is, otherwise the first SRV target, otherwise the default port
pub async fn resolve_server(
    resolver: &dyn SrvResolver,
    server: &str,
) -> Result<ServerAddress, PresenceError> {
    let (host, port) = parse_server(server)?;
    if let Some(port) = port {
        return Ok(ServerAddress::new(host, port));
    }

    match resolver.minecraft_srv(&host).await?.into_iter().next() {
        Some(target) => Ok(target),
        None => Ok(ServerAddress::new(host, DEFAULT_MINECRAFT_PORT)),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerStatus {
    #[serde(default)]
    pub players: StatusPlayers,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusPlayers {
    #[serde(default)]
    pub online: i64,
    #[serde(default)]
    pub max: i64,
    #[serde(default)]
    pub sample: Vec<SamplePlayer>,
}

#[derive(Debug, Deserialize)]
pub struct SamplePlayer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
}

/// Online players reported by a Minecraft server's status ping
pub struct ServerListPing {
    server: String,
    resolver: Arc<dyn SrvResolver>,
}

impl ServerListPing {
    pub fn new(server: impl Into<String>, resolver: Arc<dyn SrvResolver>) -> Self {
        Self {
            server: server.into(),
            resolver,
        }
    }
}

#[async_trait]
impl OnlinePlayers for ServerListPing {
    #[instrument(skip(self), fields(server = %self.server))]
    async fn online_players(&self) -> Result<Vec<OnlinePlayer>, PresenceError> {
        let address = resolve_server(self.resolver.as_ref(), &self.server).await?;
        let mut stream = TcpStream::connect((address.host.as_str(), address.port))
            .await
            .map_err(|e| io_error(&address, e))?;

        let status = ping(&mut stream, &address).await?;
        debug!(
            online = status.players.online,
            max = status.players.max,
            sampled = status.players.sample.len(),
            "Server status received"
        );
        Ok(sampled_players(status))
    }
}

fn io_error(address: &ServerAddress, error: std::io::Error) -> PresenceError {
    PresenceError::Source(format!("{}:{}: {error}", address.host, address.port))
}

/// Players to credit: the server's sample, or nobody when it reports zero online
pub fn sampled_players(status: ServerStatus) -> Vec<OnlinePlayer> {
    if status.players.online <= 0 {
        return Vec::new();
    }
    status
        .players
        .sample
        .into_iter()
        .filter(|player| !player.id.is_empty())
        .map(|player| OnlinePlayer {
            id: player.id,
            name: player.name,
        })
        .collect()
}

/// Sends a handshake and status request, then reads the status response
pub async fn ping<S>(stream: &mut S, address: &ServerAddress) -> Result<ServerStatus, PresenceError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(&status_request(address))
        .await
        .map_err(|e| io_error(address, e))?;
    stream.flush().await.map_err(|e| io_error(address, e))?;

    let length = read_varint(stream).await? as usize;
    if length > MAX_FRAME_LEN {
        return Err(PresenceError::Source(format!("status frame too large: {length}")));
    }
    let mut frame = vec![0; length];
    stream
        .read_exact(&mut frame)
        .await
        .map_err(|e| io_error(address, e))?;

    let mut body = frame.as_slice();
    let packet_id = read_varint(&mut body).await?;
    if packet_id != STATUS_PACKET_ID {
        return Err(PresenceError::Source(format!(
            "unexpected status packet id {packet_id:#04x}"
        )));
    }
    let json_len = read_varint(&mut body).await? as usize;
    let json = body
        .get(..json_len)
        .ok_or_else(|| PresenceError::Source("truncated status response".to_string()))?;

    serde_json::from_slice(json)
        .map_err(|e| PresenceError::Source(format!("invalid status json: {e}")))
}

/// Handshake (next state: status) followed by an empty status request, both framed
pub fn status_request(address: &ServerAddress) -> Vec<u8> {
    let mut handshake = Vec::new();
    write_varint(&mut handshake, STATUS_PACKET_ID);
    write_varint(&mut handshake, PING_PROTOCOL_VERSION);
    write_varint(&mut handshake, address.host.len() as i32);
    handshake.extend_from_slice(address.host.as_bytes());
    handshake.extend_from_slice(&address.port.to_be_bytes());
    write_varint(&mut handshake, NEXT_STATE_STATUS);

    let mut request = Vec::with_capacity(handshake.len() + 7);
    write_varint(&mut request, handshake.len() as i32);
    request.extend_from_slice(&handshake);
    write_varint(&mut request, 1);
    write_varint(&mut request, STATUS_PACKET_ID);
    request
}

pub fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut value = value as u32;
    loop {
        if value & !0x7f == 0 {
            buf.push(value as u8);
            return;
        }
        buf.push((value & 0x7f) as u8 | 0x80);
        value >>= 7;
    }
}

pub async fn read_varint<R>(reader: &mut R) -> Result<i32, PresenceError>
where
    R: AsyncRead + Unpin,
{
    let mut value: u32 = 0;
    for position in 0..5 {
        let byte = reader
            .read_u8()
            .await
            .map_err(|e| PresenceError::Source(format!("reading varint: {e}")))?;
        value |= u32::from(byte & 0x7f) << (7 * position);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    Err(PresenceError::Source("varint longer than 5 bytes".to_string()))
}
