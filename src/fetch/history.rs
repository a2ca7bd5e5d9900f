use serde_json::{json, Value};

use crate::config::{Credentials, FeedConfig};
use crate::error::{AppError, Result};
use crate::observe::{EventSink, FeedEvent, LogSink};
use crate::protocol::{frame, message, AuthToken, SessionIds};

use super::auth;
use super::bars::{parse_series, Bar, BarSeries};
use super::search::{search_symbols, SymbolDescriptor};
use super::symbol::{format_symbol, FuturesContract, Interval};
use super::transport::{Connector, FeedTransport, WsConnector};

const SERIES_ID: &str = "sds_1";
const SERIES_TURNAROUND: &str = "s1";
const SYMBOL_ID: &str = "sds_sym_1";

const SERIES_MARKER: &str = "timescale_update";
const COMPLETED_MARKER: &str = r#""data_completed":"end""#;

/// Quote fields the feed expects before it will serve the symbol.
const QUOTE_FIELDS: [&str; 23] = [
    "ch",
    "chp",
    "current_session",
    "description",
    "local_description",
    "language",
    "exchange",
    "fractional",
    "is_tradable",
    "lp",
    "lp_time",
    "minmov",
    "minmove2",
    "original_name",
    "pricescale",
    "pro_name",
    "short_name",
    "type",
    "update_mode",
    "volume",
    "currency_code",
    "rchp",
    "rtc",
];

/// What to fetch: the symbol, its resolution and how many bars.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRequest {
    pub symbol: String,
    /// Ignored when `symbol` is already written as `EXCHANGE:SYMBOL`.
    pub exchange: String,
    pub interval: Interval,
    pub bar_count: usize,
    pub futures_contract: Option<FuturesContract>,
    pub extended_session: bool,
}

impl HistoryRequest {
    pub fn new(symbol: impl Into<String>, exchange: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            exchange: exchange.into(),
            interval: Interval::Daily,
            bar_count: 10,
            futures_contract: None,
            extended_session: false,
        }
    }

    pub fn interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub fn bars(mut self, bar_count: usize) -> Self {
        self.bar_count = bar_count;
        self
    }

    pub fn futures_contract(mut self, contract: Option<FuturesContract>) -> Self {
        self.futures_contract = contract;
        self
    }

    pub fn extended_session(mut self, extended: bool) -> Self {
        self.extended_session = extended;
        self
    }

    pub fn qualified_symbol(&self) -> String {
        format_symbol(&self.symbol, &self.exchange, self.futures_contract)
    }
}

/// Why the receive loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Enough bars arrived to satisfy the request.
    TargetReached,
    /// The feed signalled it has no older history.
    FeedExhausted,
    /// The connection or a payload failed; the bars are whatever arrived before.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryReport {
    pub symbol: String,
    /// Newest first, unique timestamps.
    pub bars: Vec<Bar>,
    pub termination: Termination,
}

impl HistoryReport {
    pub fn is_complete(&self) -> bool {
        !matches!(self.termination, Termination::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchPhase {
    Handshaking,
    AwaitingData,
    Paginating,
    Completed,
    Failed,
}

/// Incoming message kinds, in the precedence they are tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedMessage<'a> {
    Series(&'a str),
    SeriesCompleted,
    Heartbeat(&'a str),
    Other(&'a str),
}

fn classify(message: &str) -> FeedMessage<'_> {
    if message.contains(SERIES_MARKER) {
        FeedMessage::Series(message)
    } else if message.contains(COMPLETED_MARKER) {
        FeedMessage::SeriesCompleted
    } else if frame::is_heartbeat(message) {
        FeedMessage::Heartbeat(message)
    } else {
        FeedMessage::Other(message)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Step<'a> {
    Continue,
    Echo(&'a str),
    /// Stop reading the current batch.
    Stop,
}

/// Mutable state of one `fetch_history` call.
#[derive(Debug)]
struct FetchState {
    phase: FetchPhase,
    series: BarSeries,
    remaining: i64,
    bar_count: usize,
    /// Bars on hand when the feed reported it had nothing older.
    exhausted_at: Option<usize>,
    termination: Option<Termination>,
}

impl FetchState {
    fn new(bar_count: usize) -> Self {
        Self {
            phase: FetchPhase::Handshaking,
            series: BarSeries::new(),
            remaining: i64::try_from(bar_count).unwrap_or(i64::MAX),
            bar_count,
            exhausted_at: None,
            termination: None,
        }
    }

    fn handle<'a>(
        &mut self,
        message: FeedMessage<'a>,
        symbol: &str,
        sink: &dyn EventSink,
    ) -> Result<Step<'a>> {
        match message {
            FeedMessage::Series(raw) => {
                let page = parse_series(raw, symbol)?;
                if page.is_empty() {
                    return Ok(Step::Continue);
                }
                let added = self.series.merge(page);
                self.remaining -= added as i64;
                sink.emit(FeedEvent::PageMerged {
                    symbol: symbol.to_string(),
                    bars: added,
                    remaining: self.remaining.max(0),
                });

                if self.remaining <= 0 {
                    self.phase = FetchPhase::Completed;
                    self.exhausted_at = None;
                    self.termination = Some(Termination::TargetReached);
                    sink.emit(FeedEvent::TargetReached {
                        symbol: symbol.to_string(),
                    });
                    return Ok(Step::Stop);
                }
                Ok(Step::Continue)
            }
            FeedMessage::SeriesCompleted => {
                self.phase = FetchPhase::Completed;
                self.exhausted_at = Some(self.series.len());
                self.termination = Some(Termination::FeedExhausted);
                sink.emit(FeedEvent::FeedExhausted {
                    symbol: symbol.to_string(),
                    bars: self.series.len(),
                });
                Ok(Step::Continue)
            }
            FeedMessage::Heartbeat(ping) => Ok(Step::Echo(ping)),
            FeedMessage::Other(text) => {
                sink.emit(FeedEvent::Unhandled {
                    message: text.to_string(),
                });
                Ok(Step::Continue)
            }
        }
    }

    fn fail(&mut self, reason: String) {
        self.phase = FetchPhase::Failed;
        self.termination = Some(Termination::Failed(reason));
    }

    fn limit(&self) -> usize {
        match self.exhausted_at {
            Some(cap) => cap.min(self.bar_count),
            None => self.bar_count,
        }
    }

    fn finish(self, symbol: String) -> HistoryReport {
        let limit = self.limit();
        let termination = self
            .termination
            .unwrap_or_else(|| Termination::Failed("receive loop ended unexpectedly".into()));
        HistoryReport {
            symbol,
            bars: self.series.into_descending(limit),
            termination,
        }
    }
}

/// Pick the token to present to the feed, falling back to anonymous access.
///
/// An explicit token wins; otherwise username and password are exchanged for
/// one. Without either the client proceeds unauthenticated and says so on `sink`.
pub fn resolve_token(
    config: &FeedConfig,
    credentials: &Credentials,
    sink: &dyn EventSink,
) -> AuthToken {
    if let Some(token) = &credentials.auth_token {
        return AuthToken::Token(token.clone());
    }

    let reason = match (&credentials.username, &credentials.password) {
        (Some(username), Some(password)) => match auth::login(config, username, password) {
            Some(token) => return AuthToken::Token(token),
            None => "sign-in failed",
        },
        _ => "no credentials supplied",
    };

    sink.emit(FeedEvent::AuthDegraded {
        reason: reason.to_string(),
    });
    AuthToken::Unauthenticated
}

/// Fetches historical bars over the feed's websocket protocol.
///
/// Session identifiers are generated once and reused for every fetch. Fetches
/// borrow the client mutably, so two can never share the connection.
pub struct HistoryClient<C: Connector = WsConnector> {
    config: FeedConfig,
    token: AuthToken,
    sessions: SessionIds,
    connector: C,
    sink: Box<dyn EventSink>,
}

impl HistoryClient<WsConnector> {
    pub fn new(config: FeedConfig, token: AuthToken) -> Self {
        let sessions = SessionIds::generate(&mut rand::rng());
        Self::with_parts(config, token, sessions, WsConnector, Box::new(LogSink))
    }

    pub fn from_credentials(config: FeedConfig, credentials: &Credentials) -> Self {
        let token = resolve_token(&config, credentials, &LogSink);
        Self::new(config, token)
    }
}

impl<C: Connector> HistoryClient<C> {
    pub fn with_parts(
        config: FeedConfig,
        token: AuthToken,
        sessions: SessionIds,
        connector: C,
        sink: Box<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            token,
            sessions,
            connector,
            sink,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn token(&self) -> &AuthToken {
        &self.token
    }

    pub fn sessions(&self) -> &SessionIds {
        &self.sessions
    }

    /// Newest-first bars for `request`, at most `request.bar_count` of them.
    ///
    /// Only an invalid request is an error. A dropped connection, a timeout or an
    /// unparseable page ends the fetch early and returns the bars gathered so far.
    pub fn get_history(&mut self, request: &HistoryRequest) -> Result<Vec<Bar>> {
        self.fetch_history(request).map(|report| report.bars)
    }

    /// Like [`get_history`](Self::get_history) but also reports why the fetch stopped.
    pub fn fetch_history(&mut self, request: &HistoryRequest) -> Result<HistoryReport> {
        if request.bar_count == 0 {
            return Err(AppError::invalid_argument("n_bars must be greater than 0"));
        }

        let symbol = request.qualified_symbol();
        let mut state = FetchState::new(request.bar_count);
        self.sink.emit(FeedEvent::FetchStarted {
            symbol: symbol.clone(),
        });

        let outcome = self
            .connector
            .connect(&self.config)
            .and_then(|mut transport| {
                self.sink.emit(FeedEvent::Connected {
                    url: self.config.websocket_url.clone(),
                });
                let outcome = self.drive(&mut transport, request, &symbol, &mut state);
                transport.close();
                outcome
            });

        if let Err(err) = outcome {
            self.sink.emit(FeedEvent::FetchFailed {
                symbol: symbol.clone(),
                error: err.to_string(),
                transport: err.is_transport(),
            });
            state.fail(err.to_string());
        }

        let report = state.finish(symbol);
        self.sink.emit(FeedEvent::FetchFinished {
            symbol: report.symbol.clone(),
            bars: report.bars.len(),
        });
        Ok(report)
    }

    pub fn search_symbol(&self, text: &str, exchange: &str) -> Vec<SymbolDescriptor> {
        search_symbols(&self.config, text, exchange)
    }

    fn drive<T: FeedTransport>(
        &self,
        transport: &mut T,
        request: &HistoryRequest,
        symbol: &str,
        state: &mut FetchState,
    ) -> Result<()> {
        self.handshake(transport, request, symbol)?;
        state.phase = FetchPhase::AwaitingData;

        loop {
            let buffer = transport.recv_text()?;

            for raw in frame::decode(&buffer) {
                match state.handle(classify(raw), symbol, self.sink.as_ref())? {
                    Step::Continue => {}
                    Step::Echo(ping) => {
                        transport.send_text(&frame::encode(ping))?;
                        self.sink.emit(FeedEvent::HeartbeatEchoed {
                            message: ping.to_string(),
                        });
                    }
                    Step::Stop => break,
                }
            }

            if state.phase == FetchPhase::Completed {
                return Ok(());
            }

            self.sink.emit(FeedEvent::MoreDataRequested {
                symbol: symbol.to_string(),
            });
            self.send(
                transport,
                "request_more_data",
                &[
                    json!(self.sessions.chart),
                    json!(SERIES_ID),
                    json!(self.config.page_size),
                ],
            )?;
            state.phase = FetchPhase::Paginating;
        }
    }

    fn handshake<T: FeedTransport>(
        &self,
        transport: &mut T,
        request: &HistoryRequest,
        symbol: &str,
    ) -> Result<()> {
        let quote = json!(self.sessions.quote);
        let chart = json!(self.sessions.chart);

        self.send(transport, "set_auth_token", &[json!(self.token.as_str())])?;
        self.send(transport, "chart_create_session", &[chart.clone(), json!("")])?;
        self.send(transport, "quote_create_session", &[quote.clone()])?;

        let mut fields = Vec::with_capacity(QUOTE_FIELDS.len() + 1);
        fields.push(quote.clone());
        fields.extend(QUOTE_FIELDS.iter().map(|field| json!(field)));
        self.send(transport, "quote_set_fields", &fields)?;

        self.send(transport, "quote_add_symbols", &[quote.clone(), json!(symbol)])?;
        self.send(transport, "quote_fast_symbols", &[quote, json!(symbol)])?;

        let descriptor = message::symbol_descriptor(symbol, request.extended_session)?;
        self.send(
            transport,
            "resolve_symbol",
            &[chart.clone(), json!(SYMBOL_ID), json!(descriptor)],
        )?;
        self.send(
            transport,
            "create_series",
            &[
                chart.clone(),
                json!(SERIES_ID),
                json!(SERIES_TURNAROUND),
                json!(SYMBOL_ID),
                json!(request.interval.as_str()),
                json!(self.config.page_size),
                json!(""),
            ],
        )?;
        self.send(transport, "switch_timezone", &[chart, json!("exchange")])
    }

    fn send<T: FeedTransport>(
        &self,
        transport: &mut T,
        function: &str,
        params: &[Value],
    ) -> Result<()> {
        let framed = message::build(function, params)?;
        transport.send_text(&framed)?;
        self.sink.emit(FeedEvent::CallSent {
            function: function.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::observe::RecordingSink;

    #[derive(Clone)]
    enum Script {
        Read(String),
        Fail,
    }

    #[derive(Default)]
    struct Wire {
        connects: usize,
        sent: Vec<String>,
        reads: usize,
    }

    struct ScriptedConnector {
        script: Vec<Script>,
        refuse: bool,
        wire: Arc<Mutex<Wire>>,
    }

    impl ScriptedConnector {
        fn new(script: Vec<Script>) -> Self {
            Self {
                script,
                refuse: false,
                wire: Arc::default(),
            }
        }
    }

    struct ScriptedTransport {
        script: VecDeque<Script>,
        wire: Arc<Mutex<Wire>>,
    }

    impl Connector for ScriptedConnector {
        type Transport = ScriptedTransport;

        fn connect(&self, _config: &FeedConfig) -> Result<ScriptedTransport> {
            self.wire.lock().unwrap().connects += 1;
            if self.refuse {
                return Err(AppError::Timeout);
            }
            Ok(ScriptedTransport {
                script: self.script.iter().cloned().collect(),
                wire: Arc::clone(&self.wire),
            })
        }
    }

    impl FeedTransport for ScriptedTransport {
        fn send_text(&mut self, text: &str) -> Result<()> {
            self.wire.lock().unwrap().sent.push(text.to_string());
            Ok(())
        }

        fn recv_text(&mut self) -> Result<String> {
            self.wire.lock().unwrap().reads += 1;
            match self.script.pop_front() {
                Some(Script::Read(text)) => Ok(text),
                Some(Script::Fail) => Err(AppError::ConnectionClosed),
                None => Err(AppError::Timeout),
            }
        }
    }

    fn page(start: i64, count: usize, open: f64) -> String {
        let records: Vec<String> = (0..count)
            .map(|i| {
                let ts = start + i as i64 * 86_400;
                let (high, low, close) = (open + 2.0, open - 1.0, open + 1.0);
                format!(r#"{{"i":{i},"v":[{ts},{open},{high},{low},{close},1000]}}"#)
            })
            .collect();
        frame::encode(&format!(
            r#"{{"m":"timescale_update","p":["cs_test",{{"sds_1":{{"node":"n","s":[{}],"ns":{{"d":"","indexes":[]}},"t":"s1"}}}}]}}"#,
            records.join(",")
        ))
    }

    fn completed() -> String {
        frame::encode(
            r#"{"m":"series_completed","p":["cs_test","sds_1","s1",{"rt_update_period":1,"data_completed":"end"}]}"#,
        )
    }

    fn client(
        connector: ScriptedConnector,
    ) -> (HistoryClient<ScriptedConnector>, Arc<Mutex<Wire>>, RecordingSink) {
        let wire = Arc::clone(&connector.wire);
        let sink = RecordingSink::new();
        let sessions = SessionIds::generate(&mut StdRng::seed_from_u64(1));
        let client = HistoryClient::with_parts(
            FeedConfig::builtin(),
            AuthToken::Unauthenticated,
            sessions,
            connector,
            Box::new(sink.clone()),
        );
        (client, wire, sink)
    }

    fn sent_functions(wire: &Arc<Mutex<Wire>>) -> Vec<String> {
        wire.lock()
            .unwrap()
            .sent
            .iter()
            .filter_map(|text| {
                let payload = frame::decode(text).into_iter().next()?;
                let value: Value = serde_json::from_str(payload).ok()?;
                value["m"].as_str().map(str::to_string)
            })
            .collect()
    }

    fn more_data_requests(wire: &Arc<Mutex<Wire>>) -> usize {
        sent_functions(wire)
            .iter()
            .filter(|name| *name == "request_more_data")
            .count()
    }

    fn assert_descending(bars: &[Bar]) {
        assert!(
            bars.windows(2).all(|pair| pair[0].timestamp > pair[1].timestamp),
            "bars are not strictly descending"
        );
    }

    #[test]
    fn zero_bar_count_fails_before_connecting() {
        let (mut client, wire, _) = client(ScriptedConnector::new(vec![]));

        let err = client
            .get_history(&HistoryRequest::new("INFY", "NSE").bars(0))
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert_eq!(wire.lock().unwrap().connects, 0);
    }

    #[test]
    fn sends_setup_calls_in_order() {
        let (mut client, wire, _) =
            client(ScriptedConnector::new(vec![Script::Read(page(1_700_000_000, 1, 10.0))]));

        client
            .get_history(&HistoryRequest::new("INFY", "NSE").bars(1).extended_session(true))
            .unwrap();

        assert_eq!(
            sent_functions(&wire),
            vec![
                "set_auth_token",
                "chart_create_session",
                "quote_create_session",
                "quote_set_fields",
                "quote_add_symbols",
                "quote_fast_symbols",
                "resolve_symbol",
                "create_series",
                "switch_timezone",
            ]
        );

        let sent = wire.lock().unwrap().sent.clone();
        assert!(sent[0].contains("unauthorized_user_token"));
        assert!(sent[4].contains(r#""NSE:INFY""#));
        assert!(sent[6].contains(r#"\"session\":\"extended\""#));
        assert!(sent[7].contains(r#""1D",1000,"""#));
        assert!(sent[7].contains(&client.sessions().chart));
    }

    #[test]
    fn stops_when_target_reached_without_requesting_more() {
        let (mut client, wire, sink) = client(ScriptedConnector::new(vec![
            Script::Read(page(1_700_000_000, 3, 10.0)),
            Script::Read(page(1_700_000_000 + 3 * 86_400, 2, 20.0)),
        ]));

        let report = client
            .fetch_history(&HistoryRequest::new("INFY", "NSE").bars(5))
            .unwrap();

        assert_eq!(report.termination, Termination::TargetReached);
        assert_eq!(report.bars.len(), 5);
        assert_descending(&report.bars);
        assert_eq!(more_data_requests(&wire), 1);
        assert_eq!(wire.lock().unwrap().reads, 2);
        assert!(sink
            .events()
            .contains(&FeedEvent::TargetReached { symbol: "NSE:INFY".into() }));
    }

    #[test]
    fn returns_what_arrived_when_feed_is_exhausted() {
        let (mut client, wire, _) = client(ScriptedConnector::new(vec![
            Script::Read(page(1_700_000_000, 3, 10.0)),
            Script::Read(completed()),
        ]));

        let report = client
            .fetch_history(&HistoryRequest::new("BTCUSD", "BITSTAMP").bars(10))
            .unwrap();

        assert_eq!(report.termination, Termination::FeedExhausted);
        assert_eq!(report.bars.len(), 3);
        assert_descending(&report.bars);
        assert_eq!(more_data_requests(&wire), 1);
    }

    #[test]
    fn read_failure_returns_partial_bars() {
        let (mut client, _, sink) = client(ScriptedConnector::new(vec![
            Script::Read(page(1_700_000_000, 3, 10.0)),
            Script::Fail,
        ]));

        let report = client
            .fetch_history(&HistoryRequest::new("INFY", "NSE").bars(10))
            .unwrap();

        assert_eq!(report.bars.len(), 3);
        assert!(matches!(report.termination, Termination::Failed(_)));
        assert!(!report.is_complete());
        assert!(sink.events().iter().any(|event| matches!(
            event,
            FeedEvent::FetchFailed { transport: true, .. }
        )));
    }

    #[test]
    fn empty_page_keeps_paginating() {
        let (mut client, wire, _) = client(ScriptedConnector::new(vec![
            Script::Read(page(1_700_000_000, 2, 10.0)),
            Script::Read(page(0, 0, 0.0)),
            Script::Read(page(1_700_000_000 + 2 * 86_400, 1, 20.0)),
        ]));

        let report = client
            .fetch_history(&HistoryRequest::new("INFY", "NSE").bars(3))
            .unwrap();

        assert_eq!(report.termination, Termination::TargetReached);
        assert_eq!(report.bars.len(), 3);
        assert_eq!(more_data_requests(&wire), 2);
    }

    #[test]
    fn empty_page_before_completion_ends_as_exhausted() {
        let batch = format!("{}{}", page(0, 0, 0.0), completed());
        let (mut client, _, sink) = client(ScriptedConnector::new(vec![
            Script::Read(page(1_700_000_000, 4, 10.0)),
            Script::Read(batch),
        ]));

        let report = client
            .fetch_history(&HistoryRequest::new("BTCUSD", "BITSTAMP").bars(100))
            .unwrap();

        assert_eq!(report.termination, Termination::FeedExhausted);
        assert!(report.is_complete());
        assert_eq!(report.bars.len(), 4);
        assert!(!sink
            .events()
            .iter()
            .any(|event| matches!(event, FeedEvent::FetchFailed { .. })));
    }

    #[test]
    fn unparseable_page_returns_partial_bars() {
        let broken = frame::encode(
            r#"{"m":"timescale_update","p":["cs_test",{"sds_1":{"s":[{"i":0,"v":[never,1,2,0,1,5]}],"t":"s1"}}]}"#,
        );
        let (mut client, _, _) = client(ScriptedConnector::new(vec![
            Script::Read(page(1_700_000_000, 2, 10.0)),
            Script::Read(broken),
        ]));

        let bars = client
            .get_history(&HistoryRequest::new("INFY", "NSE").bars(10))
            .unwrap();

        assert_eq!(bars.len(), 2);
    }

    #[test]
    fn refused_connection_returns_empty_series() {
        let mut connector = ScriptedConnector::new(vec![]);
        connector.refuse = true;
        let (mut client, _, _) = client(connector);

        let report = client
            .fetch_history(&HistoryRequest::new("INFY", "NSE").bars(10))
            .unwrap();

        assert!(report.bars.is_empty());
        assert!(matches!(report.termination, Termination::Failed(_)));
    }

    #[test]
    fn echoes_heartbeat_verbatim() {
        let ping = "~m~4~m~~h~7".to_string();
        let batch = format!("{}{}", page(1_700_000_000, 2, 10.0), completed());
        let (mut client, wire, _) = client(ScriptedConnector::new(vec![
            Script::Read(ping.clone()),
            Script::Read(batch),
        ]));

        let bars = client
            .get_history(&HistoryRequest::new("INFY", "NSE").bars(10))
            .unwrap();

        assert_eq!(bars.len(), 2);
        let sent = wire.lock().unwrap().sent.clone();
        assert!(sent.contains(&ping));
        assert_eq!(more_data_requests(&wire), 1);
    }

    #[test]
    fn overlapping_pages_keep_first_arrival() {
        let (mut client, _, _) = client(ScriptedConnector::new(vec![
            Script::Read(page(1_700_000_000, 3, 10.0)),
            Script::Read(page(1_700_000_000 + 2 * 86_400, 3, 99.0)),
        ]));

        let bars = client
            .get_history(&HistoryRequest::new("INFY", "NSE").bars(5))
            .unwrap();

        assert_eq!(bars.len(), 5);
        assert_descending(&bars);
        let overlap = bars
            .iter()
            .find(|bar| bar.timestamp.timestamp() == 1_700_000_000 + 2 * 86_400)
            .expect("overlapping bar present");
        assert!((overlap.open - 10.0).abs() < 1e-9);
    }

    #[test]
    fn surplus_bars_are_trimmed_to_newest() {
        let (mut client, _, _) = client(ScriptedConnector::new(vec![Script::Read(page(
            1_700_000_000,
            4,
            10.0,
        ))]));

        let bars = client
            .get_history(&HistoryRequest::new("INFY", "NSE").bars(2))
            .unwrap();

        let stamps: Vec<i64> = bars.iter().map(|bar| bar.timestamp.timestamp()).collect();
        assert_eq!(stamps, vec![1_700_000_000 + 3 * 86_400, 1_700_000_000 + 2 * 86_400]);
    }

    #[test]
    fn ignores_unrelated_messages_and_keeps_paginating() {
        let quote = frame::encode(
            r#"{"m":"qsd","p":["qs_test",{"n":"NSE:INFY","s":"ok","v":{"lp":1520.5}}]}"#,
        );
        let (mut client, wire, sink) = client(ScriptedConnector::new(vec![
            Script::Read(quote),
            Script::Read(page(1_700_000_000, 2, 10.0)),
        ]));

        let bars = client
            .get_history(&HistoryRequest::new("INFY", "NSE").bars(2))
            .unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(more_data_requests(&wire), 1);
        assert!(sink
            .events()
            .iter()
            .any(|event| matches!(event, FeedEvent::Unhandled { .. })));
    }

    #[test]
    fn state_moves_to_completed_on_target_or_exhaustion() {
        let sink = RecordingSink::new();
        let series = frame::decode(&page(1_700_000_000, 2, 10.0))[0].to_string();
        let done = frame::decode(&completed())[0].to_string();

        let mut state = FetchState::new(2);
        assert_eq!(state.phase, FetchPhase::Handshaking);
        let step = state.handle(classify(&series), "X:Y", &sink).unwrap();
        assert_eq!(step, Step::Stop);
        assert_eq!(state.phase, FetchPhase::Completed);

        let mut state = FetchState::new(10);
        state.handle(classify(&done), "X:Y", &sink).unwrap();
        assert_eq!(state.phase, FetchPhase::Completed);
        assert_eq!(state.limit(), 0);

        state.fail("socket closed".into());
        assert_eq!(state.phase, FetchPhase::Failed);
    }

    #[test]
    fn classify_prefers_series_over_completion() {
        assert!(matches!(
            classify(r#"{"m":"timescale_update","data_completed":"end"}"#),
            FeedMessage::Series(_)
        ));
        assert_eq!(
            classify(r#"{"p":[{"data_completed":"end"}]}"#),
            FeedMessage::SeriesCompleted
        );
        assert_eq!(classify("~h~12"), FeedMessage::Heartbeat("~h~12"));
        assert_eq!(classify(r#"{"m":"qsd"}"#), FeedMessage::Other(r#"{"m":"qsd"}"#));
    }

    #[test]
    fn missing_credentials_degrade_to_anonymous() {
        let sink = RecordingSink::new();

        let token = resolve_token(&FeedConfig::builtin(), &Credentials::default(), &sink);

        assert_eq!(token, AuthToken::Unauthenticated);
        assert!(matches!(
            sink.events().as_slice(),
            [FeedEvent::AuthDegraded { .. }]
        ));
    }

    #[test]
    fn explicit_token_skips_login() {
        let sink = RecordingSink::new();
        let credentials = Credentials {
            auth_token: Some("tok".into()),
            ..Credentials::default()
        };

        let token = resolve_token(&FeedConfig::builtin(), &credentials, &sink);

        assert_eq!(token, AuthToken::Token("tok".into()));
        assert!(sink.events().is_empty());
    }
}
