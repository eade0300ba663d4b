//! 头部选项注入工具
//!
//! 对一个 IPv4/TCP 报文（十六进制，或按参数合成）做一次定向注入、随机注入或删除，
//! 输出结果报文。

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use hdropt_rs::net::{Packet, Proto, TtlFocus};
use hdropt_rs::opt::{HdrOptions, InjectorConfig, OptionId, by_key};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Header {
    Ip,
    Tcp,
}

impl From<Header> for Proto {
    fn from(h: Header) -> Proto {
        match h {
            Header::Ip => Proto::Ip,
            Header::Tcp => Proto::Tcp,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "hdropt", about = "IP/TCP 头部选项注入：定向、随机或删除")]
struct Args {
    /// 输入报文（十六进制）；缺省时合成一个 TCP 数据段
    #[arg(long)]
    packet: Option<String>,

    /// 合成报文的负载长度
    #[arg(long, default_value_t = 64)]
    payload_len: usize,

    /// 编辑哪个头部
    #[arg(long, value_enum, default_value_t = Header::Ip)]
    header: Header,

    /// 定向注入的选项（配置键，例如 ip_noop）
    #[arg(long, conflicts_with = "remove")]
    option: Option<String>,

    /// 删除该选项的全部出现
    #[arg(long)]
    remove: Option<String>,

    /// 请求腐化
    #[arg(long)]
    corrupt: bool,

    /// 先剥离已有选项
    #[arg(long)]
    strip: bool,

    /// 已知的到目的地跳数
    #[arg(long)]
    ttl: Option<u8>,

    /// JSON 配置文件
    #[arg(long)]
    config: Option<PathBuf>,

    /// 覆盖配置中的随机种子
    #[arg(long)]
    seed: Option<u64>,

    /// 覆盖配置中的 MTU
    #[arg(long)]
    mtu: Option<usize>,

    /// 额外启用默认关闭的选项，可重复
    #[arg(long = "enable")]
    enable: Vec<String>,
}

fn parse_hex(raw: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let digits: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    hex::decode(digits)
}

fn lookup_option(key: &str) -> OptionId {
    by_key(key).unwrap_or_else(|| {
        eprintln!("error: unknown option key {key}");
        process::exit(2);
    })
}

fn main() {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => InjectorConfig::load(path).unwrap_or_else(|e| {
            eprintln!("error: {e}");
            process::exit(2);
        }),
        None => InjectorConfig::default(),
    };
    if args.seed.is_some() {
        cfg.seed = args.seed;
    }
    if let Some(mtu) = args.mtu {
        cfg.mtu = mtu;
    }
    cfg.enabled.extend(args.enable.iter().cloned());
    if let Err(e) = cfg.validate() {
        eprintln!("error: {e}");
        process::exit(2);
    }

    let mut pkt = match &args.packet {
        Some(raw) => {
            let bytes = parse_hex(raw).unwrap_or_else(|e| {
                eprintln!("error: bad hex packet: {e}");
                process::exit(2);
            });
            Packet::from_bytes(bytes).unwrap_or_else(|e| {
                eprintln!("error: {e}");
                process::exit(2);
            })
        }
        None => Packet::tcp_v4(
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
            40_000,
            80,
            1,
            &vec![0u8; args.payload_len],
        ),
    };

    let ttl = args.ttl.map(TtlFocus::known).unwrap_or_default();
    let proto = Proto::from(args.header);

    let mut hdr = HdrOptions::new(proto, &mut pkt, ttl, &cfg).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(3);
    });

    let (mode, ok) = match (&args.option, &args.remove) {
        (Some(key), _) => ("inject", hdr.inject_opt(args.corrupt, args.strip, lookup_option(key))),
        (None, Some(key)) => ("remove", hdr.remove_option(lookup_option(key))),
        (None, None) => ("random", hdr.inject_random_opts(args.corrupt, args.strip)),
    };
    let corrupt_done = hdr.session().corrupt_done();
    drop(hdr);

    println!(
        "result mode={} ok={} corrupt_done={} ip_hdr_len={} tcp_hdr_len={} pkt_len={}",
        mode,
        ok,
        corrupt_done,
        pkt.ip_hdr_len(),
        pkt.tcp_hdr_len(),
        pkt.len()
    );
    println!("packet {}", hex::encode(pkt.as_bytes()));
}
