use std::{
    io,
    net::{TcpListener, TcpStream, ToSocketAddrs},
};

use threadpool::ThreadPool;

use crate::{serve, App};

/// Accepts TCP connections and hands each one to a worker thread running the
/// per-connection serve loop. Connections are independent: a handler failure
/// ends that connection only.
pub struct Server<'a> {
    thread_pool: ThreadPool,
    incoming: Box<dyn Iterator<Item = TcpStream> + 'a>,
}

impl<'a> Server<'a> {
    pub fn serve<Handle>(self, app: Handle) -> io::Result<()>
    where
        Handle: App,
        Handle: Send + Clone + 'static,
    {
        for conn in self.incoming {
            let app = app.clone();
            self.thread_pool.execute(move || {
                if let Err(err) = serve(conn, app) {
                    tracing::debug!("connection ended with error: {err}");
                }
            });
        }

        Ok(())
    }

    pub fn builder() -> ServerBuilder {
        Default::default()
    }

    pub fn bind<A: ToSocketAddrs>(addr: A) -> Server<'static> {
        Self::builder().bind(addr)
    }
}

pub struct ServerBuilder {
    max_threads: usize,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self { max_threads: 512 }
    }
}

impl ServerBuilder {
    pub fn max_threads(self, max_threads: usize) -> Self {
        Self { max_threads }
    }

    pub fn from_connections<'a, T: IntoIterator<Item = TcpStream> + 'a>(
        self,
        conns: T,
    ) -> Server<'a> {
        Server {
            thread_pool: ThreadPool::new(self.max_threads),
            incoming: Box::new(conns.into_iter()),
        }
    }

    pub fn bind<A: ToSocketAddrs>(self, addr: A) -> Server<'static> {
        self.try_bind(addr).unwrap()
    }

    pub fn try_bind<A: ToSocketAddrs>(self, addr: A) -> io::Result<Server<'static>> {
        let listener = TcpListener::bind(addr)?;
        Ok(self.from_connections(Box::new(TcpAcceptor { listener })))
    }
}

struct TcpAcceptor {
    listener: TcpListener,
}

impl Iterator for TcpAcceptor {
    type Item = TcpStream;

    fn next(&mut self) -> Option<Self::Item> {
        let (conn, addr) = self.listener.accept().ok()?;
        tracing::debug!(peer = %addr, "accepted connection");
        Some(conn)
    }
}
