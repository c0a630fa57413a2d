use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "certsub - 基于 TLS 证书 SAN 的递归子域/根域发现工具",
    long_about = "NAME:\n  certsub - 基于 TLS 证书 SAN 的递归子域/根域发现工具\n\nUSAGE:\n  certsub <SUBCOMMAND> [OPTIONS] [DOMAIN]...\n\nCOMMANDS:\n  enum (e)   从根域出发递归探测 443 端口证书，收集 DNS Names 并扩展队列\n  probe (p)  仅探测给定主机一次，打印其证书 DNS Names\n\n快速示例:\n  certsub enum example.com -s www -s api -o out.txt\n  certsub enum example.co.uk -t co --output-type json -o out.json\n  certsub probe example.com"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 递归发现 (enum) - 证书 SAN 收集、泛域名展开、根域归并与输出
    #[command(alias = "e", after_help = "枚举参数分组:\n  输入: [DOMAIN]... -d --domain-list --stdin\n  扩展: -s/--sub -t/--top\n  连接: --timeout --port\n  输出: -o --output-type --gzip --append --not-print\n  日志: -v/--verbose --log-level")]
    Enum(EnumArgs),
    /// 单次探测 (probe) - 不递归，直接打印每个主机叶子证书中的 DNS Names
    #[command(alias = "p")]
    Probe(ProbeArgs),
}

/// Common args reused by multiple subcommands
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// 目标域名，可重复
    #[arg(short = 'd', long = "domain")]
    pub domains: Vec<String>,

    /// 位置参数域名
    #[arg(value_name = "DOMAIN")]
    pub positional_domains: Vec<String>,

    /// 从 stdin 读取域名列表
    #[arg(long = "stdin")]
    pub stdin: bool,

    /// 连接与握手超时 (秒)
    #[arg(long = "timeout", default_value_t = 3)]
    pub timeout: u64,

    /// 探测端口
    #[arg(long = "port", default_value_t = 443)]
    pub port: u16,

    /// 日志级别: error|warn|info|debug|silent
    #[arg(long = "log-level", default_value = "info", value_parser = ["error","warn","info","debug","silent"])]
    pub log_level: String,
}

#[derive(Args, Debug)]
pub struct EnumArgs {
    /// 基本通用参数
    #[command(flatten)]
    pub common: CommonArgs,

    /// 读取根域的列表文件 (每行一个)
    #[arg(long = "domain-list", alias = "ds")]
    pub domain_list: Option<PathBuf>,

    /// 子域前缀，可重复 (默认 www)；用于根域与泛域名展开
    #[arg(short = 's', long = "sub")]
    pub sub_prefixes: Vec<String>,

    /// 根域判定用的顶级标签，可重复 (默认 com,net,org,gov,edu,co)
    #[arg(short = 't', long = "top")]
    pub top_labels: Vec<String>,

    /// 输出文件路径
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// 输出类型: txt/txt-domain/json/jsonl/csv
    #[arg(long = "output-type", alias = "oy", default_value = "txt", value_parser = ["txt","txt-domain","json","jsonl","csv"])]
    pub output_type: String,

    /// 使用 gzip 压缩 (文件名以 .gz 结尾自动开启)
    #[arg(long = "gzip")]
    pub gzip: bool,

    /// 追加写入输出文件（默认覆盖写入）
    #[arg(long = "append")]
    pub append: bool,

    /// 不在屏幕打印
    #[arg(long = "not-print", alias = "np")]
    pub not_print: bool,

    /// 打印每个探测目标的进度与失败原因
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// 基本通用参数
    #[command(flatten)]
    pub common: CommonArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_enum() {
        let cli = Cli::try_parse_from([
            "certsub", "e", "example.com", "-d", "example.org", "-s", "www", "-s", "api",
            "-t", "co", "--timeout", "5", "-o", "out.json", "--oy", "json", "-v",
        ])
        .unwrap();
        match cli.command {
            Commands::Enum(a) => {
                assert_eq!(a.common.positional_domains, vec!["example.com".to_string()]);
                assert_eq!(a.common.domains, vec!["example.org".to_string()]);
                assert_eq!(a.sub_prefixes, vec!["www".to_string(), "api".to_string()]);
                assert_eq!(a.top_labels, vec!["co".to_string()]);
                assert_eq!(a.common.timeout, 5);
                assert_eq!(a.common.port, 443);
                assert_eq!(a.output_type, "json");
                assert!(a.verbose);
            }
            _ => panic!("expected enum"),
        }
    }

    #[test]
    fn test_parse_probe_defaults() {
        let cli = Cli::try_parse_from(["certsub", "probe", "example.com"]).unwrap();
        match cli.command {
            Commands::Probe(a) => {
                assert_eq!(a.common.timeout, 3);
                assert_eq!(a.common.log_level, "info");
            }
            _ => panic!("expected probe"),
        }
    }

    #[test]
    fn test_rejects_unknown_output_type() {
        assert!(Cli::try_parse_from(["certsub", "enum", "a.com", "--output-type", "parquet"]).is_err());
    }
}
