//! Request tokens for discarding stale responses.
//!
//! Every logical operation (a generation submission, a history refresh)
//! issues a new token. Only the most recently issued token may settle; a
//! response carrying any older token is dropped on arrival.

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Outcome of handing a response back to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The response was current and the state changed.
    Applied,
    /// A newer request was issued meanwhile; the response was ignored.
    Stale,
}

/// Monotonic token issuer tracking the single outstanding request.
#[derive(Debug, Default)]
pub struct RequestTokens {
    last_issued: u64,
    outstanding: Option<RequestToken>,
}

impl RequestTokens {
    /// Issue a token that supersedes any outstanding one.
    pub fn issue(&mut self) -> RequestToken {
        self.last_issued += 1;
        let token = RequestToken(self.last_issued);
        self.outstanding = Some(token);
        token
    }

    /// Settle `token` if it is the outstanding one. Returns false for stale tokens.
    pub fn settle(&mut self, token: RequestToken) -> bool {
        if self.outstanding == Some(token) {
            self.outstanding = None;
            true
        } else {
            false
        }
    }

    /// Drop the outstanding request so its response will be treated as stale.
    pub fn abandon(&mut self) -> Option<RequestToken> {
        self.outstanding.take()
    }

    pub fn outstanding(&self) -> Option<RequestToken> {
        self.outstanding
    }
}
