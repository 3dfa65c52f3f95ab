use crate::app::Command;
use crate::form::FormData;

/// 移動時間からアヴスパセリングを計算して保存するサブコマンド。
#[derive(Debug, clap::Args)]
pub struct AddArgs {
    #[clap(
        short = 'a',
        long = "arrival",
        help = "Arrival time in the format YYYY-MM-DDTHH:MM"
    )]
    arrival: Option<String>,

    #[clap(
        short = 'd',
        long = "departure",
        help = "Departure time in the format YYYY-MM-DDTHH:MM"
    )]
    departure: Option<String>,

    #[clap(
        short = 'f',
        long = "fraction",
        help = "Portion of the period to take as time off: 1/3, 1/2, 2/3, 1/1 or a decimal"
    )]
    fraction: Option<String>,

    #[clap(
        short = 'm',
        long = "description",
        help = "Free text description of the trip",
        default_value = ""
    )]
    description: String,
}

impl AddArgs {
    /// フォームの送信コマンドに変換する。
    ///
    /// 未入力の項目は空文字列として送信し、検証はフォームで行う。
    pub fn into_command(self) -> Command {
        Command::Submit(FormData {
            arrival: self.arrival.unwrap_or_default(),
            departure: self.departure.unwrap_or_default(),
            fraction: self.fraction.unwrap_or_default(),
            description: self.description,
        })
    }
}
