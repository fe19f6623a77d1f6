//! Integration tests for the server over real sockets.

use banktx_client::{shutdown, ClientConfig, ClientError, ServerProxy, TransferDriver};
use banktx_core::{AccountId, AccountReport, LockMode};
use banktx_protocol::{read_message, write_message, Message};
use banktx_server::{Server, ServerConfig, ServerContext, ServerResult};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct Running {
    addr: SocketAddr,
    context: Arc<ServerContext>,
    handle: JoinHandle<ServerResult<AccountReport>>,
}

impl Running {
    fn start(accounts: u32, balance: i64) -> Self {
        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap())
            .with_number_of_accounts(accounts)
            .with_initial_balance(balance);
        let server = Server::bind(config).unwrap();
        let addr = server.local_addr();
        let context = Arc::clone(server.context());
        let handle = thread::spawn(move || server.run());
        Self {
            addr,
            context,
            handle,
        }
    }

    fn stop(self) -> AccountReport {
        shutdown(self.addr).unwrap();
        self.handle.join().unwrap().unwrap()
    }

    fn wait_for_waiters(&self, account: AccountId, count: usize) {
        for _ in 0..1000 {
            let waiting = self
                .context
                .engine()
                .locks()
                .snapshot(account)
                .map_or(0, |snap| snap.waiters.len());
            if waiting == count {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("expected {count} waiter(s) on {account}");
    }
}

fn acct(id: u32) -> AccountId {
    AccountId::new(id)
}

#[test]
fn concrete_transfer_commits() {
    let server = Running::start(2, 10);

    let mut proxy = ServerProxy::connect(server.addr).unwrap();
    proxy.open_transaction().unwrap();
    assert_eq!(proxy.read(acct(1)).unwrap(), 10);
    proxy.write(acct(1), 5).unwrap();
    assert_eq!(proxy.read(acct(2)).unwrap(), 10);
    proxy.write(acct(2), 15).unwrap();
    proxy.close_transaction().unwrap();

    let report = server.stop();
    assert_eq!(report.accounts[0].balance, 5);
    assert_eq!(report.accounts[1].balance, 15);
    assert_eq!(report.total, 20);
}

#[test]
fn writer_blocks_until_holder_commits() {
    let server = Running::start(2, 10);

    let mut t1 = ServerProxy::connect(server.addr).unwrap();
    t1.open_transaction().unwrap();
    t1.write(acct(1), 5).unwrap();

    let addr = server.addr;
    let t2 = thread::spawn(move || -> Result<i64, ClientError> {
        let mut t2 = ServerProxy::connect(addr)?;
        t2.open_transaction()?;
        t2.write(acct(1), 0)?;
        t2.close_transaction()?;

        let mut check = ServerProxy::connect(addr)?;
        check.open_transaction()?;
        let balance = check.read(acct(2))?;
        check.close_transaction()?;
        Ok(balance)
    });

    server.wait_for_waiters(acct(1), 1);
    let snap = server.context.engine().locks().snapshot(acct(1)).unwrap();
    assert_eq!(snap.mode, LockMode::Write);
    assert_eq!(snap.holders.len(), 1);

    t1.read(acct(2)).unwrap();
    t1.write(acct(2), 15).unwrap();
    t1.close_transaction().unwrap();

    assert_eq!(t2.join().unwrap().unwrap(), 15);
    let report = server.stop();
    assert_eq!(report.accounts[0].balance, 0);
    assert_eq!(report.accounts[1].balance, 15);
}

#[test]
fn holder_with_waiters_is_aborted_and_rolled_back() {
    let server = Running::start(3, 10);

    // t1 holds WRITE on 1 and has touched 3.
    let mut t1 = ServerProxy::connect(server.addr).unwrap();
    t1.open_transaction().unwrap();
    t1.write(acct(1), 1).unwrap();
    t1.write(acct(3), 100).unwrap();

    // t2 holds WRITE on 2, then waits for READ on 1.
    let mut t2 = ServerProxy::connect(server.addr).unwrap();
    t2.open_transaction().unwrap();
    t2.write(acct(2), 2).unwrap();
    let waiter = thread::spawn(move || -> Result<i64, ClientError> {
        let seen = t2.read(acct(1))?;
        t2.close_transaction()?;
        Ok(seen)
    });
    server.wait_for_waiters(acct(1), 1);

    // t1 asks for 2 while t2 waits on a lock t1 holds: t1 is the one aborted.
    let err = t1.read(acct(2)).unwrap_err();
    assert!(err.is_aborted(), "unexpected error: {err}");

    // t2 sees t1's rolled-back value.
    assert_eq!(waiter.join().unwrap().unwrap(), 10);

    let counts = server.context.engine().registry().counts();
    assert_eq!((counts.committed, counts.aborted), (1, 1));
    let report = server.stop();
    assert_eq!(report.accounts[0].balance, 10);
    assert_eq!(report.accounts[1].balance, 2);
    assert_eq!(report.accounts[2].balance, 10);
}

#[test]
fn concurrent_transfers_conserve_total() {
    let server = Running::start(4, 50);

    let config = ClientConfig::new(server.addr)
        .with_number_of_accounts(4)
        .with_number_of_transactions(40)
        .with_transfer_amount(5);
    let stats = TransferDriver::new(config).unwrap().run().unwrap();
    assert_eq!(stats.committed, 40);

    let registry = server.context.engine().registry().counts();
    assert_eq!(registry.committed, 40);
    assert_eq!(registry.aborted as u64, stats.aborted_attempts);
    assert_eq!(registry.running, 0);

    let report = server.stop();
    assert_eq!(report.total, 200);
}

#[test]
fn unknown_account_does_not_end_transaction() {
    let server = Running::start(2, 10);

    let mut proxy = ServerProxy::connect(server.addr).unwrap();
    proxy.open_transaction().unwrap();
    assert!(matches!(
        proxy.read(acct(77)),
        Err(ClientError::AccountNotFound(_))
    ));
    proxy.write(acct(2), 3).unwrap();
    proxy.close_transaction().unwrap();

    let report = server.stop();
    assert_eq!(report.accounts[1].balance, 3);
}

#[test]
fn protocol_violation_keeps_server_running() {
    let server = Running::start(2, 10);

    let mut raw = TcpStream::connect(server.addr).unwrap();
    write_message(&mut raw, &Message::CloseTransaction).unwrap();
    assert!(read_message(&mut raw).unwrap().is_none());
    assert!(!server.context.is_shutting_down());

    let mut proxy = ServerProxy::connect(server.addr).unwrap();
    proxy.open_transaction().unwrap();
    proxy.close_transaction().unwrap();

    let report = server.stop();
    assert_eq!(report.total, 20);
}

#[test]
fn dropped_connection_rolls_back_and_stops_server() {
    let server = Running::start(2, 10);

    let mut proxy = ServerProxy::connect(server.addr).unwrap();
    proxy.open_transaction().unwrap();
    proxy.write(acct(1), 999).unwrap();
    drop(proxy);

    let report = server.handle.join().unwrap().unwrap();
    assert_eq!(report.total, 20);
    assert_eq!(server.context.engine().registry().counts().aborted, 1);
}
