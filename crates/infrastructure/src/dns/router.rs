use super::tsig::SignedMessage;
use super::wire::{self, QueryMessage, Rcode, ReplyHeader, WireError, WireName};
use fakedns_domain::Transport;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// One parsed inbound query with its transport context.
pub struct InboundQuery<'a> {
    pub bytes: &'a [u8],
    pub message: QueryMessage,
    /// Present when the last additional record is a TSIG record.
    pub signed: Option<SignedMessage>,
    pub peer: SocketAddr,
    pub transport: Transport,
}

/// Answers queries routed to one zone. `None` means nothing is written back.
pub trait QueryHandler: Send + Sync {
    fn handle(&self, query: &InboundQuery<'_>) -> Option<Vec<u8>>;
}

/// Per-instance dispatch table: zone name to handler, longest suffix wins.
#[derive(Default)]
pub struct ZoneRouter {
    routes: Vec<(String, Arc<dyn QueryHandler>)>,
}

impl ZoneRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        mut self,
        zone: &str,
        handler: Arc<dyn QueryHandler>,
    ) -> Result<Self, WireError> {
        let zone = WireName::parse(zone)?.to_lowercase().as_str().to_string();
        self.routes.retain(|(existing, _)| *existing != zone);
        self.routes.push((zone, handler));
        self.routes
            .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
        Ok(self)
    }

    pub fn zones(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|(zone, _)| zone.as_str())
    }

    pub fn route(&self, name: &WireName) -> Option<&Arc<dyn QueryHandler>> {
        let name = name.as_str().to_ascii_lowercase();
        self.routes
            .iter()
            .find(|(zone, _)| in_zone(&name, zone))
            .map(|(_, handler)| handler)
    }

    /// Parses `bytes` and hands the query to the zone's handler. Queries with
    /// no question or outside every zone get REFUSED; unparseable bytes are
    /// dropped.
    pub fn dispatch(
        &self,
        bytes: &[u8],
        peer: SocketAddr,
        transport: Transport,
    ) -> Option<Vec<u8>> {
        let message = match QueryMessage::parse(bytes) {
            Ok(message) => message,
            Err(e) => {
                debug!(client = %peer, protocol = %transport, error = %e, "Dropping unparseable query");
                return None;
            }
        };

        let signed = SignedMessage::split(bytes).unwrap_or_else(|e| {
            debug!(client = %peer, error = %e, "Ignoring malformed record sections");
            None
        });

        let handler = message
            .question
            .as_ref()
            .and_then(|question| self.route(&question.name));

        match handler {
            Some(handler) => handler.handle(&InboundQuery {
                bytes,
                message,
                signed,
                peer,
                transport,
            }),
            None => {
                debug!(
                    client = %peer,
                    domain = message.question.as_ref().map(|q| q.name.as_str()).unwrap_or("<none>"),
                    "No zone for query, refusing"
                );
                refused(&message)
            }
        }
    }
}

fn in_zone(name: &str, zone: &str) -> bool {
    if zone == "." || name == zone {
        return true;
    }
    name.strip_suffix(zone)
        .is_some_and(|prefix| prefix.ends_with('.'))
}

fn refused(message: &QueryMessage) -> Option<Vec<u8>> {
    let header = ReplyHeader::for_query(message).with_rcode(Rcode::Refused);
    wire::encode_reply(header, message.question.as_ref(), &[])
        .map_err(|e| debug!(error = %e, "Failed to encode REFUSED reply"))
        .ok()
}
