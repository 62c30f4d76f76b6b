//! Blocking TCP client
//!
//! Sends request frames on behalf of a fixed caller identity.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;

use alloy_primitives::Address;

use crate::error::Result;
use crate::protocol::{
    decode_round, encode_request, read_response, write_request, AdminCommand, ReadQuery, Request,
    WriteBatch,
};

/// A connection to a FeedStore server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    caller: Address,
}

impl Client {
    /// Connect to `addr`, identifying every request as `caller`
    pub fn connect(addr: &str, caller: Address) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            caller,
        })
    }

    /// Send an already encoded request and wait for its response payload
    pub fn call_raw(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        write_request(&mut self.writer, &self.caller, payload)?;
        read_response(&mut self.reader)?.into_result()
    }

    /// Send a request and wait for its response payload
    pub fn call(&mut self, request: &Request) -> Result<Vec<u8>> {
        self.call_raw(&encode_request(request))
    }

    /// Submit a write batch
    pub fn write(&mut self, batch: WriteBatch) -> Result<()> {
        self.call(&Request::Write(batch)).map(|_| ())
    }

    /// Run a read query
    pub fn read(&mut self, query: ReadQuery) -> Result<Vec<u8>> {
        self.call(&Request::Read(query))
    }

    /// Latest round of a feed
    pub fn latest_round(&mut self, stride: u8, id: u128) -> Result<u16> {
        let word = self.read(ReadQuery::LatestRound { stride, id })?;
        decode_round(&word)
    }

    /// Issue a privileged proxy command
    pub fn admin(&mut self, command: AdminCommand) -> Result<()> {
        self.call(&Request::Admin(command)).map(|_| ())
    }

    /// The identity this client sends as
    pub fn caller(&self) -> Address {
        self.caller
    }
}
