use super::router::{InboundQuery, QueryHandler};
use super::tsig::{self, TsigKeyring};
use super::wire::{self, ReplyHeader, WireName};
use fakedns_application::use_cases::AnswerQueryUseCase;
use fakedns_domain::DnsRequest;
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds the reply for one query routed to the edge zone.
///
/// Replies echo the question, carry the matching canned records, are signed
/// when the query was signed with a known key, and are cut in half with TC
/// set when the sentinel name is asked for.
pub struct Responder {
    answer_query: AnswerQueryUseCase,
    sentinel: WireName,
    keyring: Arc<TsigKeyring>,
}

impl Responder {
    pub fn new(answer_query: AnswerQueryUseCase, sentinel: WireName, keyring: Arc<TsigKeyring>) -> Self {
        Self {
            answer_query,
            sentinel,
            keyring,
        }
    }

    fn sign(&self, query: &InboundQuery<'_>, reply: Vec<u8>) -> Vec<u8> {
        let Some(signed) = &query.signed else {
            return reply;
        };

        let now = tsig::unix_now();
        let result = self
            .keyring
            .verify_request(signed, now)
            .and_then(|key| key.sign_response(&reply, &signed.tsig.mac, now));

        match result {
            Ok(signed_reply) => signed_reply,
            Err(e) => {
                warn!(
                    client = %query.peer,
                    key = %signed.tsig.key_name.as_str(),
                    error = %e,
                    "TSIG check failed, replying unsigned"
                );
                reply
            }
        }
    }
}

impl QueryHandler for Responder {
    fn handle(&self, query: &InboundQuery<'_>) -> Option<Vec<u8>> {
        let question = query.message.question.as_ref()?;

        let request = DnsRequest::new(question.name.as_str(), question.qtype, query.peer.ip());
        let answers = self.answer_query.execute(&request);

        let truncate = question.name.eq_ignore_case(&self.sentinel);
        let header = ReplyHeader::for_query(&query.message).with_truncated(truncate);

        let reply = match wire::encode_reply(header, Some(question), &answers) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(domain = %question.name.as_str(), error = %e, "Failed to encode reply");
                return None;
            }
        };
        let mut reply = self.sign(query, reply);

        debug!(
            client = %query.peer,
            protocol = %query.transport,
            domain = %question.name.as_str(),
            qtype = question.qtype,
            answers = answers.len(),
            truncated = truncate,
            "Answering query"
        );

        if truncate {
            reply.truncate(reply.len() / 2);
        }
        Some(reply)
    }
}
