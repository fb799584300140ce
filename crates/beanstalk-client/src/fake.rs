//! In-process beanstalkd stand-in for tests
//!
//! Speaks the same command subset as [`BeanstalkClient`](crate::BeanstalkClient)
//! over a loopback TCP listener. Jobs are seeded directly with
//! [`FakeServer::put`]; every command line received is recorded.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

#[derive(Default)]
struct State {
    ready: BTreeMap<String, VecDeque<(u64, Vec<u8>)>>,
    reserved: HashSet<u64>,
    deleted: Vec<u64>,
    commands: Vec<String>,
    watchers: BTreeMap<String, u64>,
    next_id: u64,
}

pub struct FakeServer {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
    job_ready: Arc<Notify>,
    reserve_blocked: Arc<Notify>,
    acceptor: JoinHandle<()>,
}

impl FakeServer {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = Arc::new(Mutex::new(State {
            next_id: 1,
            ..State::default()
        }));
        state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .ready
            .entry("default".to_string())
            .or_default();

        let job_ready = Arc::new(Notify::new());
        let reserve_blocked = Arc::new(Notify::new());

        let acceptor = {
            let state = state.clone();
            let job_ready = job_ready.clone();
            let reserve_blocked = reserve_blocked.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let session = Session {
                        state: state.clone(),
                        job_ready: job_ready.clone(),
                        reserve_blocked: reserve_blocked.clone(),
                        watching: vec!["default".to_string()],
                    };
                    tokio::spawn(session.serve(stream));
                }
            })
        };

        Ok(FakeServer {
            addr,
            state,
            job_ready,
            reserve_blocked,
            acceptor,
        })
    }

    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    /// Enqueue a ready job and return its id
    pub fn put(&self, tube: &str, body: &[u8]) -> u64 {
        let id = {
            let mut state = self.lock();
            let id = state.next_id;
            state.next_id += 1;
            state
                .ready
                .entry(tube.to_string())
                .or_default()
                .push_back((id, body.to_vec()));
            id
        };
        self.job_ready.notify_waiters();
        id
    }

    /// Every command line received so far, across all connections
    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    /// Ids deleted so far, in order
    pub fn deleted(&self) -> Vec<u64> {
        self.lock().deleted.clone()
    }

    pub fn ready_count(&self, tube: &str) -> usize {
        self.lock().ready.get(tube).map_or(0, VecDeque::len)
    }

    /// Resolves once some connection is parked in `reserve` with nothing to hand out
    pub async fn reserve_blocked(&self) {
        self.reserve_blocked.notified().await;
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}

struct Session {
    state: Arc<Mutex<State>>,
    job_ready: Arc<Notify>,
    reserve_blocked: Arc<Notify>,
    watching: Vec<String>,
}

impl Session {
    async fn serve(mut self, stream: TcpStream) {
        let (read, mut write) = stream.into_split();
        let mut reader = BufReader::new(read);
        self.adjust_watchers(&self.watching.clone(), 1);

        loop {
            let mut line = String::new();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim_end_matches(['\r', '\n']).to_string();
            self.lock().commands.push(line.clone());

            let mut parts = line.split(' ');
            let command = parts.next().unwrap_or_default();
            let arg = parts.next().unwrap_or_default().to_string();

            let reply = match command {
                "use" => {
                    self.lock().ready.entry(arg.clone()).or_default();
                    format!("USING {}\r\n", arg).into_bytes()
                }
                "watch" => {
                    if !self.watching.contains(&arg) {
                        self.watching.push(arg.clone());
                        self.adjust_watchers(&[arg.clone()], 1);
                        self.lock().ready.entry(arg).or_default();
                    }
                    format!("WATCHING {}\r\n", self.watching.len()).into_bytes()
                }
                "ignore" => {
                    if self.watching == [arg.clone()] {
                        b"NOT_IGNORED\r\n".to_vec()
                    } else {
                        if self.watching.contains(&arg) {
                            self.adjust_watchers(&[arg.clone()], -1);
                        }
                        self.watching.retain(|t| *t != arg);
                        format!("WATCHING {}\r\n", self.watching.len()).into_bytes()
                    }
                }
                "reserve" => self.reserve().await,
                // Answers immediately whatever the timeout
                "reserve-with-timeout" => self
                    .try_reserve()
                    .unwrap_or_else(|| b"TIMED_OUT\r\n".to_vec()),
                "delete" => {
                    let id: u64 = arg.parse().unwrap_or_default();
                    let mut state = self.lock();
                    if state.reserved.remove(&id) {
                        state.deleted.push(id);
                        b"DELETED\r\n".to_vec()
                    } else {
                        b"NOT_FOUND\r\n".to_vec()
                    }
                }
                "list-tubes" => {
                    let names: Vec<String> = self.lock().ready.keys().cloned().collect();
                    let mut yaml = "---\n".to_string();
                    for name in names {
                        yaml.push_str(&format!("- {}\n", name));
                    }
                    ok_body(&yaml)
                }
                "stats-tube" => {
                    let state = self.lock();
                    match state.ready.get(&arg) {
                        Some(jobs) => ok_body(&format!(
                            "---\nname: {}\ncurrent-jobs-ready: {}\ncurrent-watching: {}\n",
                            arg,
                            jobs.len(),
                            state.watchers.get(&arg).copied().unwrap_or_default(),
                        )),
                        None => b"NOT_FOUND\r\n".to_vec(),
                    }
                }
                "quit" => break,
                _ => b"UNKNOWN_COMMAND\r\n".to_vec(),
            };

            if write.write_all(&reply).await.is_err() {
                break;
            }
        }

        // Jobs reserved by a closed session are not released
        self.adjust_watchers(&self.watching.clone(), -1);
    }

    async fn reserve(&self) -> Vec<u8> {
        loop {
            let notified = self.job_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(reply) = self.try_reserve() {
                return reply;
            }

            self.reserve_blocked.notify_one();
            notified.await;
        }
    }

    fn try_reserve(&self) -> Option<Vec<u8>> {
        let mut state = self.lock();
        let tube = self
            .watching
            .iter()
            .find(|t| state.ready.get(*t).is_some_and(|jobs| !jobs.is_empty()))?
            .clone();

        let (id, body) = state.ready.get_mut(&tube)?.pop_front()?;
        state.reserved.insert(id);

        let mut reply = format!("RESERVED {} {}\r\n", id, body.len()).into_bytes();
        reply.extend_from_slice(&body);
        reply.extend_from_slice(b"\r\n");
        Some(reply)
    }

    fn adjust_watchers(&self, tubes: &[String], delta: i64) {
        let mut state = self.lock();
        for tube in tubes {
            let count = state.watchers.entry(tube.clone()).or_default();
            *count = count.saturating_add_signed(delta);
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn ok_body(body: &str) -> Vec<u8> {
    format!("OK {}\r\n{}\r\n", body.len(), body).into_bytes()
}
