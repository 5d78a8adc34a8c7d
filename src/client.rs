use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::PathBuf,
    time::Duration,
};

use crate::config::Config;
use crate::error::Error;
use crate::jsonrpc::minreq_http::{self, Builder, HttpError, MinreqHttpTransport};
use jsonrpc::{Request, serde, serde_json};
use tracing::debug;

/// Identifier sent with every request; calls are strictly sequential.
pub const REQUEST_ID: &str = "btc-regtest";

/// Protocol version announced in the request envelope.
pub const JSONRPC_VERSION: &str = "1.0";

/// Default transport deadline; large `generatetoaddress` calls can be slow.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(900);

/// client authentication methods
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum Auth {
    None,
    UserPass(String, String),
    CookieFile(PathBuf),
}

impl Auth {
    /// Convert into a user/password pair, reading the cookie file if needed.
    pub fn get_user_pass(self) -> Result<(Option<String>, Option<String>), Error> {
        match self {
            Auth::None => Ok((None, None)),
            Auth::UserPass(u, p) => Ok((Some(u), Some(p))),
            Auth::CookieFile(path) => {
                let line = BufReader::new(File::open(path)?)
                    .lines()
                    .next()
                    .ok_or(Error::InvalidCookieFile)??;
                let colon = line.find(':').ok_or(Error::InvalidCookieFile)?;
                Ok((Some(line[..colon].into()), Some(line[colon + 1..].into())))
            }
        }
    }
}

/// Anything that can execute a JSON-RPC call against the node.
///
/// The command dispatcher is written against this trait so it can be driven
/// by [`Client`] in the binary and by scripted doubles in tests.
pub trait RpcApi {
    /// Calls `method` with positional `args`, routed to `wallet` when given,
    /// and returns the raw `result` value.
    fn call_raw(
        &self,
        method: &str,
        args: &[serde_json::Value],
        wallet: Option<&str>,
    ) -> Result<serde_json::Value, Error>;
}

// RPC Client.
#[derive(Debug, Clone)]
pub struct Client {
    /// Base URL of the node, without a trailing slash.
    url: String,
    user: String,
    pass: Option<String>,
    timeout: Duration,
}

impl Client {
    /// Creates a client to a bitcoind JSON-RPC server.
    ///
    /// Requires authentication via username/password or cookie file. The
    /// cookie is read once, here.
    pub fn with_auth(url: &str, auth: Auth) -> Result<Self, Error> {
        if matches!(auth, Auth::None) {
            return Err(Error::MissingAuthentication);
        }

        let cookie = matches!(auth, Auth::CookieFile(_));
        let (user, pass) = auth
            .get_user_pass()
            .map_err(|e| if cookie { Error::InvalidCookieFile } else { e })?;
        let user = user.ok_or(Error::MissingAuthentication)?;

        let client = Self {
            url: url.trim_end_matches('/').to_string(),
            user,
            pass,
            timeout: DEFAULT_TIMEOUT,
        };

        client.transport(&client.url)?;

        Ok(client)
    }

    /// Creates a client from the process configuration.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self::with_auth(&config.rpc_url, config.auth())?.with_timeout(config.timeout()))
    }

    /// Overrides the transport deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The URL a call is sent to: the base URL, or the wallet-scoped path.
    pub fn endpoint(&self, wallet: Option<&str>) -> String {
        match wallet {
            Some(name) => format!("{}/wallet/{}", self.url, name),
            None => self.url.clone(),
        }
    }

    fn transport(&self, url: &str) -> Result<MinreqHttpTransport, Error> {
        Ok(Builder::new()
            .url(url)
            .map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?
            .timeout(self.timeout)
            .basic_auth(self.user.clone(), self.pass.clone())
            .build())
    }

    /// Calls the RPC `method` with a given `args` list on the default endpoint.
    pub fn call<T>(&self, method: &str, args: &[serde_json::Value]) -> Result<T, Error>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        self.call_at(&self.endpoint(None), method, args)
    }

    /// Calls the RPC `method` on the endpoint of the named wallet.
    pub fn call_wallet<T>(
        &self,
        wallet: &str,
        method: &str,
        args: &[serde_json::Value],
    ) -> Result<T, Error>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        self.call_at(&self.endpoint(Some(wallet)), method, args)
    }

    fn call_at<T>(&self, url: &str, method: &str, args: &[serde_json::Value]) -> Result<T, Error>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        debug!(method, url, params = args.len(), "sending RPC request");

        let inner = jsonrpc::Client::with_transport(self.transport(url)?);
        let raw = serde_json::value::to_raw_value(args)?;
        let request = Request {
            method,
            params: Some(&*raw),
            id: serde_json::Value::from(REQUEST_ID),
            jsonrpc: Some(JSONRPC_VERSION),
        };
        let resp = inner
            .send_request(request)
            .map_err(|e| classify(e, url))?;

        Ok(resp.result()?)
    }
}

impl RpcApi for Client {
    fn call_raw(
        &self,
        method: &str,
        args: &[serde_json::Value],
        wallet: Option<&str>,
    ) -> Result<serde_json::Value, Error> {
        match wallet {
            Some(wallet) => self.call_wallet(wallet, method, args),
            None => self.call(method, args),
        }
    }
}

/// Splits transport failures into "the node said no" and "no node there".
fn classify(err: jsonrpc::Error, url: &str) -> Error {
    let err = match err {
        jsonrpc::Error::Transport(err) => err,
        other => return other.into(),
    };

    match err.downcast::<minreq_http::Error>() {
        Ok(err) => match *err {
            minreq_http::Error::Http(HttpError { status_code, body }) => Error::Http {
                status: status_code,
                body,
            },
            minreq_http::Error::Json(e) => Error::Json(e),
            minreq_http::Error::Minreq(
                e @ (minreq::Error::IoError(_) | minreq::Error::AddressNotFound),
            ) => Error::Connection {
                url: url.to_string(),
                source: Box::new(e),
            },
            // The node (or something in front of it) answered, just not with JSON-RPC.
            other => Error::InvalidResponse(format!("{url}: {other}")),
        },
        Err(err) => Error::JsonRpc(jsonrpc::Error::Transport(err)),
    }
}
